//! Small helpers over tree-sitter nodes.

use ngcheck_core::model::{LineIndex, Literal, Span};
use tree_sitter::Node;

/// Source text of a node.
pub(crate) fn text<'a>(node: Node<'_>, src: &'a str) -> &'a str {
    node.utf8_text(src.as_bytes()).unwrap_or("")
}

/// Source text with all whitespace removed (`this.x$\n  .pipe` -> `this.x$.pipe`).
pub(crate) fn compact(node: Node<'_>, src: &str) -> String {
    text(node, src).split_whitespace().collect()
}

/// Source text with whitespace runs collapsed to one space.
pub(crate) fn collapse(node: Node<'_>, src: &str) -> String {
    text(node, src).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Span of a node.
pub(crate) fn span(node: Node<'_>, index: &LineIndex) -> Span {
    index.span(node.start_byte(), node.end_byte() - node.start_byte())
}

/// Named children of a node, skipping comments.
pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Strips wrappers that do not change what an expression evaluates to.
pub(crate) fn unwrap_expression(mut node: Node<'_>) -> Node<'_> {
    while matches!(
        node.kind(),
        "parenthesized_expression" | "as_expression" | "satisfies_expression" | "non_null_expression"
    ) {
        match named_children(node).into_iter().next() {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

/// Returns true for arrow functions and function expressions.
pub(crate) fn is_function(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

/// Parameters node of a function-like node.
pub(crate) fn parameters(node: Node<'_>) -> Option<Node<'_>> {
    node.child_by_field_name("parameters")
        .or_else(|| node.child_by_field_name("parameter"))
}

/// Names bound by a parameter list (or a lone arrow parameter).
pub(crate) fn parameter_names(params: Node<'_>, src: &str) -> Vec<String> {
    let mut names = Vec::new();
    if params.kind() == "identifier" {
        names.push(text(params, src).to_string());
        return names;
    }
    for param in named_children(params) {
        let pattern = param.child_by_field_name("pattern").unwrap_or(param);
        if pattern.kind() == "this" {
            continue;
        }
        bound_names(pattern, src, &mut names);
    }
    names
}

/// Identifiers bound by a binding pattern.
pub(crate) fn bound_names(pattern: Node<'_>, src: &str, names: &mut Vec<String>) {
    match pattern.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            names.push(text(pattern, src).to_string());
        }
        "pair_pattern" => {
            if let Some(value) = pattern.child_by_field_name("value") {
                bound_names(value, src, names);
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = pattern.child_by_field_name("left") {
                bound_names(left, src, names);
            }
        }
        "object_pattern" | "array_pattern" | "rest_pattern" => {
            for child in named_children(pattern) {
                bound_names(child, src, names);
            }
        }
        _ => {}
    }
}

/// The text inside a string literal's quotes.
pub(crate) fn string_content(node: Node<'_>, src: &str) -> String {
    let raw = text(node, src);
    raw.get(1..raw.len().saturating_sub(1))
        .unwrap_or_default()
        .to_string()
}

/// Span of the text between a string's delimiters.
pub(crate) fn inner_span(node: Node<'_>, index: &LineIndex) -> Span {
    let start = node.start_byte() + 1;
    let end = node.end_byte().saturating_sub(1).max(start);
    index.span(start, end - start)
}

/// Object key as written, without quotes.
pub(crate) fn key_text(node: Node<'_>, src: &str) -> String {
    match node.kind() {
        "string" => string_content(node, src),
        _ => text(node, src).to_string(),
    }
}

/// Converts an expression into a literal tree.
pub(crate) fn literal(node: Node<'_>, src: &str, index: &LineIndex) -> Literal {
    let node = unwrap_expression(node);
    match node.kind() {
        "string" => Literal::Str(string_content(node, src)),
        "template_string" => {
            Literal::Template(string_content(node, src), inner_span(node, index))
        }
        "number" => Literal::Number(text(node, src).to_string()),
        "true" => Literal::Bool(true),
        "false" => Literal::Bool(false),
        "null" | "undefined" => Literal::Null,
        "identifier" | "member_expression" => Literal::Ident(compact(node, src)),
        "array" => Literal::Array(
            named_children(node)
                .into_iter()
                .map(|el| literal(el, src, index))
                .collect(),
        ),
        "object" => {
            let mut entries = Vec::new();
            for child in named_children(node) {
                match child.kind() {
                    "pair" => {
                        let (Some(key), Some(value)) = (
                            child.child_by_field_name("key"),
                            child.child_by_field_name("value"),
                        ) else {
                            continue;
                        };
                        entries.push((key_text(key, src), literal(value, src, index)));
                    }
                    "shorthand_property_identifier" => {
                        let name = text(child, src).to_string();
                        entries.push((name.clone(), Literal::Ident(name)));
                    }
                    _ => {}
                }
            }
            Literal::Object(entries)
        }
        _ => Literal::Other(collapse(node, src)),
    }
}
