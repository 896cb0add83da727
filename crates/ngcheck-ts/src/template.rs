//! Inline template scanning.
//!
//! Angular templates are not TypeScript, so they are scanned with regular
//! expressions rather than parsed: element tags, bound attributes,
//! interpolations, `@for`/`@if` blocks and pipes are enough for the template
//! facts.

use std::sync::LazyLock;

use ngcheck_core::model::{Binding, BindingId, BindingKind, LineIndex, Template};
use regex::Regex;

/// An opening tag and its attribute section.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([A-Za-z][\w:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

/// `name="value"` or `name='value'` inside a tag.
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([*\[(]{0,2}[\w.:@$-]+[\])]{0,2})\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .unwrap_or_else(|_| panic!("Invalid Regex"))
});

static INTERPOLATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{\{(.*?)\}\}").unwrap_or_else(|_| panic!("Invalid Regex"))
});

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(for|if|else if|switch|case|defer)\s*\(").unwrap_or_else(|_| panic!("Invalid Regex"))
});

static PIPE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_$][\w$]*)").unwrap_or_else(|_| panic!("Invalid Regex"))
});

/// The operand right before a `|`.
static OPERAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z_$][\w$.]*(?:\(\))?)\s*$").unwrap_or_else(|_| panic!("Invalid Regex"))
});

/// Element index used for bindings that do not sit on an element.
const NO_ELEMENT: usize = usize::MAX;

struct Found {
    kind: BindingKind,
    name: String,
    expression: String,
    element: usize,
    /// Start of the binding, relative to the template text.
    start: usize,
    len: usize,
    /// Start of `expression`, relative to the template text.
    expression_start: usize,
}

/// Scans an inline template into bindings ordered by position.
///
/// Spans are file spans: `template.span` locates the text in the file and
/// `index` is that file's line index.
#[must_use]
pub fn scan_template(template: &Template, index: &LineIndex) -> Vec<Binding> {
    let text = template.text.as_str();
    let mut found = Vec::new();
    let mut tag_starts = Vec::new();

    for (element, tag) in TAG_RE.captures_iter(text).enumerate() {
        let Some(whole) = tag.get(0) else { continue };
        tag_starts.push(whole.start());
        let Some(attrs) = tag.get(2) else { continue };
        for attr in ATTR_RE.captures_iter(attrs.as_str()) {
            let (Some(name), Some(value)) = (attr.get(1), attr.get(2).or_else(|| attr.get(3))) else {
                continue;
            };
            let Some((kind, bound)) = classify(name.as_str()) else {
                continue;
            };
            let start = attrs.start() + name.start();
            found.push(Found {
                kind,
                name: bound.to_string(),
                expression: value.as_str().to_string(),
                element,
                start,
                len: attrs.start() + value.end() + 1 - start,
                expression_start: attrs.start() + value.start(),
            });
        }
    }

    for m in INTERPOLATION_RE.captures_iter(text) {
        let (Some(whole), Some(inner)) = (m.get(0), m.get(1)) else {
            continue;
        };
        found.push(Found {
            kind: BindingKind::Interpolation,
            name: "interpolation".into(),
            expression: inner.as_str().trim().to_string(),
            element: element_at(&tag_starts, whole.start()),
            start: whole.start(),
            len: whole.len(),
            expression_start: inner.start() + leading_ws(inner.as_str()),
        });
    }

    for m in BLOCK_RE.captures_iter(text) {
        let (Some(whole), Some(name)) = (m.get(0), m.get(1)) else {
            continue;
        };
        let open = whole.end() - 1;
        let Some(close) = matching_paren(text, open) else {
            continue;
        };
        let inner = &text[open + 1..close];
        found.push(Found {
            kind: BindingKind::ControlFlow,
            name: name.as_str().replace(' ', "-"),
            expression: inner.trim().to_string(),
            element: NO_ELEMENT,
            start: whole.start(),
            len: close + 1 - whole.start(),
            expression_start: open + 1 + leading_ws(inner),
        });
    }

    let pipes: Vec<Found> = found
        .iter()
        .filter(|f| f.kind != BindingKind::Event)
        .flat_map(pipes_in)
        .collect();
    found.extend(pipes);

    found.sort_by_key(|f| f.start);
    found
        .into_iter()
        .enumerate()
        .map(|(i, f)| Binding {
            id: BindingId(i),
            kind: f.kind,
            name: f.name,
            expression: f.expression,
            element: f.element,
            span: index.span(template.span.offset + f.start, f.len),
        })
        .collect()
}

/// Binding kind and bound name of an attribute, or `None` for plain attributes.
fn classify(attr: &str) -> Option<(BindingKind, &str)> {
    if let Some(name) = attr.strip_prefix('*') {
        return Some((BindingKind::Structural, name));
    }
    if let Some(name) = attr.strip_prefix("[(").and_then(|a| a.strip_suffix(")]")) {
        return Some((BindingKind::Property, name));
    }
    if let Some(name) = attr.strip_prefix('[').and_then(|a| a.strip_suffix(']')) {
        return Some((BindingKind::Property, name));
    }
    if let Some(name) = attr.strip_prefix('(').and_then(|a| a.strip_suffix(')')) {
        return Some((BindingKind::Event, name));
    }
    None
}

/// Pipe applications inside a binding expression.
fn pipes_in(binding: &Found) -> Vec<Found> {
    let expr = binding.expression.as_str();
    let bytes = expr.as_bytes();
    let mut pipes = Vec::new();
    for (pos, _) in expr.match_indices('|') {
        let before = pos.checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(pos + 1).copied();
        if before == Some(b'|') || after == Some(b'|') {
            continue;
        }
        let Some(name) = PIPE_NAME_RE.captures(&expr[pos + 1..]).and_then(|c| c.get(1)) else {
            continue;
        };
        let Some(operand) = OPERAND_RE.captures(&expr[..pos]).and_then(|c| c.get(1)) else {
            continue;
        };
        let start = binding.expression_start + operand.start();
        pipes.push(Found {
            kind: BindingKind::Pipe,
            name: name.as_str().to_string(),
            expression: operand.as_str().to_string(),
            element: binding.element,
            start,
            len: binding.expression_start + pos + 1 + name.end() - start,
            expression_start: start,
        });
    }
    pipes
}

/// Index of the last element starting at or before `offset`.
fn element_at(tag_starts: &[usize], offset: usize) -> usize {
    match tag_starts.partition_point(|&s| s <= offset) {
        0 => NO_ELEMENT,
        n => n - 1,
    }
}

/// Position of the `)` closing the `(` at `open`, skipping quoted text.
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text[open..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn leading_ws(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngcheck_core::model::Span;

    fn scan(text: &str) -> Vec<Binding> {
        let template = Template {
            text: text.to_string(),
            span: Span::new(0, text.len(), 1, 1),
        };
        scan_template(&template, &LineIndex::new(text))
    }

    fn summary(bindings: &[Binding]) -> Vec<(BindingKind, &str, &str)> {
        bindings
            .iter()
            .map(|b| (b.kind, b.name.as_str(), b.expression.as_str()))
            .collect()
    }

    #[test]
    fn attributes_are_classified() {
        let b = scan(r#"<input [value]="name" (input)="set($event)" [(ngModel)]="draft" class="x">"#);
        assert_eq!(
            summary(&b),
            vec![
                (BindingKind::Property, "value", "name"),
                (BindingKind::Event, "input", "set($event)"),
                (BindingKind::Property, "ngModel", "draft"),
            ]
        );
        assert!(b.iter().all(|b| b.element == 0));
    }

    #[test]
    fn structural_directives_share_their_element() {
        let b = scan(r#"<ul><li *ngFor="let u of users" *ngIf="u.active">{{ u.name }}</li></ul>"#);
        assert_eq!(
            summary(&b),
            vec![
                (BindingKind::Structural, "ngFor", "let u of users"),
                (BindingKind::Structural, "ngIf", "u.active"),
                (BindingKind::Interpolation, "interpolation", "u.name"),
            ]
        );
        assert_eq!(b[0].element, 1);
        assert_eq!(b[1].element, 1);
        assert_eq!(b[2].element, 1);
    }

    #[test]
    fn control_flow_blocks_capture_their_header() {
        let b = scan("@for (item of items(); track item.id) {\n  <p>{{ total(item) }}</p>\n}");
        assert_eq!(b[0].kind, BindingKind::ControlFlow);
        assert_eq!(b[0].name, "for");
        assert_eq!(b[0].expression, "item of items(); track item.id");
        assert_eq!(b[0].element, NO_ELEMENT);
        assert_eq!(b[1].expression, "total(item)");
        assert_eq!(b[1].span.line, 2);
    }

    #[test]
    fn pipes_record_their_operand() {
        let b = scan(r#"<p *ngIf="user$ | async as user">{{ items() | json }} {{ a || b }}</p>"#);
        let pipes: Vec<_> = b.iter().filter(|b| b.kind == BindingKind::Pipe).collect();
        assert_eq!(pipes.len(), 2);
        assert_eq!((pipes[0].name.as_str(), pipes[0].expression.as_str()), ("async", "user$"));
        assert_eq!((pipes[1].name.as_str(), pipes[1].expression.as_str()), ("json", "items()"));
        let text = r#"<p *ngIf="user$ | async as user">"#;
        assert_eq!(&text[pipes[0].span.offset..pipes[0].span.offset + pipes[0].span.length], "user$ | async");
    }

    #[test]
    fn bindings_are_ordered_by_offset() {
        let b = scan(r#"{{ a }}<b [x]="y">{{ c }}</b>"#);
        let offsets: Vec<usize> = b.iter().map(|b| b.span.offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        assert_eq!(offsets, sorted);
        assert_eq!(b[0].element, NO_ELEMENT);
        assert!(b.iter().enumerate().all(|(i, b)| b.id == BindingId(i)));
    }

    #[test]
    fn spans_are_file_relative() {
        let text = "<p>{{ x }}</p>";
        let template = Template {
            text: text.into(),
            span: Span::new(100, text.len(), 5, 13),
        };
        let file = format!("{}\n{}", "a".repeat(99), text);
        let b = scan_template(&template, &LineIndex::new(&file));
        assert_eq!(b[0].span.offset, 103);
        assert_eq!(b[0].span.line, 2);
    }
}
