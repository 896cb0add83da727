//! TypeScript front end.

use ngcheck_core::model::{
    DeclId, DeclKind, Declaration, Decorator, Initializer, LineIndex, Member, MemberId, MemberKind,
    SourceModel, SyntaxError, Template,
};
use ngcheck_core::LanguageFrontend;
use tracing::{debug, warn};
use tree_sitter::{Language, Node, Parser};

use crate::collector::Collector;
use crate::syntax::{
    collapse, compact, inner_span, is_function, key_text, literal, named_children, parameter_names,
    parameters, span, string_content, text, unwrap_expression,
};
use crate::template::scan_template;

/// Selector factories from `@ngrx/store`.
const SELECTOR_FACTORIES: &[&str] = &[
    "createSelector",
    "createFeatureSelector",
    "createSelectorFactory",
];

/// Functional guard and resolver types.
const GUARD_TYPES: &[&str] = &[
    "CanActivateFn",
    "CanActivateChildFn",
    "CanDeactivateFn",
    "CanMatchFn",
    "ResolveFn",
];

/// Parses TypeScript sources into [`SourceModel`]s.
///
/// Parsing never fails: syntax errors become [`SyntaxError`] entries and a
/// grammar that cannot be loaded yields a model with a single error.
pub struct TypeScriptFrontend {
    language: Language,
    extensions: &'static [&'static str],
}

impl TypeScriptFrontend {
    /// Front end for `.ts` files.
    #[must_use]
    pub fn new() -> Self {
        Self {
            language: tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            extensions: &[".ts"],
        }
    }

    /// Front end for `.tsx` files.
    #[must_use]
    pub fn tsx() -> Self {
        Self {
            language: tree_sitter_typescript::LANGUAGE_TSX.into(),
            extensions: &[".tsx"],
        }
    }
}

impl Default for TypeScriptFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageFrontend for TypeScriptFrontend {
    fn language_id(&self) -> &'static str {
        "typescript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        self.extensions
    }

    fn parse(&self, source: &str) -> SourceModel {
        let index = LineIndex::new(source);
        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&self.language) {
            warn!("Failed to load TypeScript grammar: {}", e);
            return failed(&index, format!("cannot load grammar: {e}"));
        }
        let Some(tree) = parser.parse(source, None) else {
            return failed(&index, "parser produced no tree".to_string());
        };
        let root = tree.root_node();

        let mut model = SourceModel::default();
        if root.has_error() {
            syntax_errors(root, source, &index, &mut model.syntax_errors);
            debug!("{} syntax errors", model.syntax_errors.len());
            return model;
        }

        let mut builder = ModelBuilder {
            src: source,
            index: &index,
            declarations: Vec::new(),
        };
        for node in named_children(root) {
            builder.top_level(node);
        }
        model.declarations = builder.declarations;
        model
    }
}

fn failed(index: &LineIndex, message: String) -> SourceModel {
    SourceModel {
        declarations: Vec::new(),
        syntax_errors: vec![SyntaxError {
            span: index.span(0, 0),
            message,
        }],
    }
}

fn syntax_errors(node: Node<'_>, src: &str, index: &LineIndex, out: &mut Vec<SyntaxError>) {
    if node.is_error() {
        let snippet: String = text(node, src).split_whitespace().collect::<Vec<_>>().join(" ");
        let snippet: String = snippet.chars().take(24).collect();
        out.push(SyntaxError {
            span: span(node, index),
            message: format!("unexpected `{snippet}`"),
        });
        return;
    }
    if node.is_missing() {
        out.push(SyntaxError {
            span: span(node, index),
            message: format!("missing `{}`", node.kind()),
        });
        return;
    }
    if !node.has_error() {
        return;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    for child in children {
        syntax_errors(child, src, index, out);
    }
}

struct ModelBuilder<'s> {
    src: &'s str,
    index: &'s LineIndex,
    declarations: Vec<Declaration>,
}

impl ModelBuilder<'_> {
    fn top_level(&mut self, node: Node<'_>) {
        if node.kind() == "export_statement" {
            let mut cursor = node.walk();
            let decorators: Vec<Node<'_>> =
                node.children_by_field_name("decorator", &mut cursor).collect();
            if let Some(declaration) = node.child_by_field_name("declaration") {
                self.declaration(declaration, &decorators, node);
            }
        } else {
            self.declaration(node, &[], node);
        }
    }

    fn declaration<'t>(&mut self, node: Node<'t>, decorators: &[Node<'t>], outer: Node<'t>) {
        match node.kind() {
            "class_declaration" | "abstract_class_declaration" => self.class(node, decorators, outer),
            "function_declaration" | "generator_function_declaration" => self.function(node, outer),
            "lexical_declaration" | "variable_declaration" => {
                let declarators: Vec<Node<'_>> = named_children(node)
                    .into_iter()
                    .filter(|d| d.kind() == "variable_declarator")
                    .collect();
                let single = declarators.len() == 1;
                for declarator in declarators {
                    self.variable(declarator, if single { outer } else { declarator });
                }
            }
            _ => {}
        }
    }

    fn next_id(&self) -> DeclId {
        DeclId(self.declarations.len())
    }

    fn class<'t>(&mut self, node: Node<'t>, outer_decorators: &[Node<'t>], outer: Node<'t>) {
        let name = node
            .child_by_field_name("name")
            .map_or("<anonymous>", |n| text(n, self.src));
        let mut decl = Declaration::new(self.next_id(), DeclKind::Class, name, span(outer, self.index));

        let mut cursor = node.walk();
        let own: Vec<Node<'t>> = node.children_by_field_name("decorator", &mut cursor).collect();
        let decorator_nodes: Vec<Node<'t>> = outer_decorators.iter().copied().chain(own).collect();
        decl.decorators = decorator_nodes.iter().map(|d| self.decorator(*d)).collect();
        decl.template = decorator_nodes
            .iter()
            .filter(|d| decorator_name(**d, self.src) == "Component")
            .find_map(|d| self.template(*d));
        decl.heritage = self.heritage(node);

        let mut collector = Collector::new(self.src, self.index);
        if let Some(body) = node.child_by_field_name("body") {
            self.class_body(body, &mut decl, &mut collector);
        }
        decl.calls = collector.calls;
        decl.writes = collector.writes;
        decl.literals = collector.literals;
        if let Some(template) = &decl.template {
            decl.bindings = scan_template(template, self.index);
        }
        decl.kind = classify_class(&decl);
        debug!("class {} classified as {}", decl.name, decl.kind.as_str());
        self.declarations.push(decl);
    }

    fn class_body(&self, body: Node<'_>, decl: &mut Declaration, collector: &mut Collector<'_>) {
        let mut pending: Vec<Decorator> = Vec::new();
        for child in named_children(body) {
            match child.kind() {
                "decorator" => pending.push(self.decorator(child)),
                "method_definition" | "abstract_method_signature" => {
                    let id = MemberId(decl.members.len());
                    let name = child
                        .child_by_field_name("name")
                        .map_or(String::new(), |n| key_text(n, self.src));
                    let mut cursor = child.walk();
                    let is_accessor = child
                        .children(&mut cursor)
                        .any(|c| matches!(c.kind(), "get" | "set"));
                    let kind = if name == "constructor" {
                        MemberKind::Constructor
                    } else if is_accessor {
                        MemberKind::Accessor
                    } else {
                        MemberKind::Method
                    };
                    let params = child.child_by_field_name("parameters");
                    decl.members.push(Member {
                        id,
                        name,
                        kind,
                        declared_type: child
                            .child_by_field_name("return_type")
                            .map(|t| type_text(t, self.src)),
                        initializer: None,
                        decorators: std::mem::take(&mut pending),
                        parameters: params.map(|p| parameter_names(p, self.src)).unwrap_or_default(),
                        span: span(child, self.index),
                    });
                    collector.set_member(Some(id));
                    collector.function(params, child.child_by_field_name("body"));
                    if kind == MemberKind::Constructor {
                        if let Some(params) = params {
                            self.parameter_properties(params, decl);
                        }
                    }
                }
                "public_field_definition" | "field_definition" => {
                    let id = MemberId(decl.members.len());
                    let mut decorators = std::mem::take(&mut pending);
                    let mut cursor = child.walk();
                    let own: Vec<Node<'_>> =
                        child.children_by_field_name("decorator", &mut cursor).collect();
                    decorators.extend(own.into_iter().map(|d| self.decorator(d)));
                    let name = child
                        .child_by_field_name("name")
                        .or_else(|| child.child_by_field_name("property"))
                        .map_or(String::new(), |n| key_text(n, self.src));
                    let value = child.child_by_field_name("value");
                    decl.members.push(Member {
                        id,
                        name: name.clone(),
                        kind: MemberKind::Field,
                        declared_type: child
                            .child_by_field_name("type")
                            .map(|t| type_text(t, self.src)),
                        initializer: value.map(|v| self.initializer(v)),
                        decorators,
                        parameters: Vec::new(),
                        span: span(child, self.index),
                    });
                    if let Some(value) = value {
                        collector.set_member(Some(id));
                        collector.initializer(&name, vec!["this".to_string(), name.clone()], value);
                    }
                }
                _ => pending.clear(),
            }
        }
        collector.set_member(None);
    }

    /// Constructor parameters declared with an accessibility or `readonly`
    /// modifier become members.
    fn parameter_properties(&self, params: Node<'_>, decl: &mut Declaration) {
        for param in named_children(params) {
            let mut cursor = param.walk();
            let children: Vec<Node<'_>> = param.children(&mut cursor).collect();
            let is_property = children
                .iter()
                .any(|c| matches!(c.kind(), "accessibility_modifier" | "readonly"));
            if !is_property {
                continue;
            }
            let Some(pattern) = param.child_by_field_name("pattern") else {
                continue;
            };
            let decorators = children
                .iter()
                .filter(|c| c.kind() == "decorator")
                .map(|d| self.decorator(*d))
                .collect();
            decl.members.push(Member {
                id: MemberId(decl.members.len()),
                name: text(pattern, self.src).to_string(),
                kind: MemberKind::Parameter,
                declared_type: param
                    .child_by_field_name("type")
                    .map(|t| type_text(t, self.src)),
                initializer: None,
                decorators,
                parameters: Vec::new(),
                span: span(param, self.index),
            });
        }
    }

    fn function(&mut self, node: Node<'_>, outer: Node<'_>) {
        let name = node
            .child_by_field_name("name")
            .map_or("<anonymous>", |n| text(n, self.src));
        let kind = if name.ends_with("Reducer") || name.ends_with("reducer") {
            DeclKind::Reducer
        } else if name.ends_with("Guard") {
            DeclKind::Guard
        } else {
            DeclKind::Function
        };
        let mut decl = Declaration::new(self.next_id(), kind, name, span(outer, self.index));
        let params = node.child_by_field_name("parameters");
        decl.parameters = params.map(|p| parameter_names(p, self.src)).unwrap_or_default();

        let mut collector = Collector::new(self.src, self.index);
        collector.function(params, node.child_by_field_name("body"));
        decl.calls = collector.calls;
        decl.writes = collector.writes;
        decl.literals = collector.literals;
        self.declarations.push(decl);
    }

    fn variable(&mut self, declarator: Node<'_>, outer: Node<'_>) {
        let Some(name_node) = declarator.child_by_field_name("name") else {
            return;
        };
        let name = text(name_node, self.src);
        let value = declarator.child_by_field_name("value");
        let annotation = declarator
            .child_by_field_name("type")
            .map(|t| type_text(t, self.src))
            .unwrap_or_default();
        let callee = value.and_then(|v| outer_callee(v, self.src));
        let function_value = value.map(unwrap_expression).filter(|v| is_function(*v));

        let kind = match callee.as_deref() {
            Some("createReducer") => DeclKind::Reducer,
            Some(c) if SELECTOR_FACTORIES.contains(&c) => DeclKind::Selector,
            Some("createEffect") => DeclKind::EffectBlock,
            _ if name.ends_with("Guard") || GUARD_TYPES.iter().any(|g| annotation.starts_with(g)) => {
                DeclKind::Guard
            }
            _ if function_value.is_some() && name.to_ascii_lowercase().ends_with("reducer") => {
                DeclKind::Reducer
            }
            _ if function_value.is_some() => DeclKind::Function,
            _ => DeclKind::Constant,
        };

        let mut decl = Declaration::new(self.next_id(), kind, name, span(outer, self.index));
        decl.parameters = function_value
            .and_then(parameters)
            .map(|p| parameter_names(p, self.src))
            .unwrap_or_default();
        if let Some(value) = value {
            let mut collector = Collector::new(self.src, self.index);
            collector.initializer(name, vec![name.to_string()], value);
            decl.calls = collector.calls;
            decl.writes = collector.writes;
            decl.literals = collector.literals;
        }
        self.declarations.push(decl);
    }

    fn decorator(&self, node: Node<'_>) -> Decorator {
        let expression = named_children(node).into_iter().next();
        let (name, arguments) = match expression {
            Some(call) if call.kind() == "call_expression" => {
                let name = call
                    .child_by_field_name("function")
                    .map_or(String::new(), |f| compact(f, self.src));
                let arguments = call
                    .child_by_field_name("arguments")
                    .map(named_children)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|a| literal(a, self.src, self.index))
                    .collect();
                (name, arguments)
            }
            Some(other) => (compact(other, self.src), Vec::new()),
            None => (String::new(), Vec::new()),
        };
        Decorator {
            name,
            arguments,
            span: span(node, self.index),
        }
    }

    /// The inline `template` of a `@Component` decorator.
    fn template(&self, decorator: Node<'_>) -> Option<Template> {
        let call = named_children(decorator).into_iter().next()?;
        let args = call.child_by_field_name("arguments")?;
        let object = named_children(args)
            .into_iter()
            .map(unwrap_expression)
            .find(|a| a.kind() == "object")?;
        let value = named_children(object).into_iter().find_map(|pair| {
            let key = pair.child_by_field_name("key")?;
            (pair.kind() == "pair" && key_text(key, self.src) == "template")
                .then(|| pair.child_by_field_name("value"))
                .flatten()
        })?;
        match value.kind() {
            "template_string" | "string" => Some(Template {
                text: string_content(value, self.src),
                span: inner_span(value, self.index),
            }),
            _ => None,
        }
    }

    fn heritage(&self, class: Node<'_>) -> Vec<String> {
        let mut names = Vec::new();
        for child in named_children(class) {
            if child.kind() != "class_heritage" {
                continue;
            }
            for clause in named_children(child) {
                for item in named_children(clause) {
                    if item.kind() == "type_arguments" {
                        continue;
                    }
                    let name = compact(item, self.src);
                    let name = name.split('<').next().unwrap_or_default().to_string();
                    if !name.is_empty() {
                        names.push(name);
                    }
                }
            }
        }
        names
    }

    fn initializer(&self, value: Node<'_>) -> Initializer {
        Initializer {
            text: collapse(value, self.src),
            callee: outer_callee(value, self.src),
            span: span(value, self.index),
        }
    }
}

fn decorator_name(node: Node<'_>, src: &str) -> String {
    match named_children(node).into_iter().next() {
        Some(call) if call.kind() == "call_expression" => call
            .child_by_field_name("function")
            .map_or(String::new(), |f| compact(f, src)),
        Some(other) => compact(other, src),
        None => String::new(),
    }
}

/// Outermost callee of an expression: `signal`, `input.required`,
/// `new BehaviorSubject`. Type arguments are not part of the callee.
fn outer_callee(value: Node<'_>, src: &str) -> Option<String> {
    let value = unwrap_expression(value);
    match value.kind() {
        "call_expression" => value
            .child_by_field_name("function")
            .map(|f| compact(f, src)),
        "new_expression" => value
            .child_by_field_name("constructor")
            .map(|c| format!("new {}", compact(c, src))),
        "await_expression" => named_children(value)
            .into_iter()
            .next()
            .and_then(|inner| outer_callee(inner, src)),
        _ => None,
    }
}

/// A type annotation's text without the leading `:`.
fn type_text(node: Node<'_>, src: &str) -> String {
    let raw = collapse(node, src);
    raw.strip_prefix(':').map_or(raw.clone(), |t| t.trim().to_string())
}

fn classify_class(decl: &Declaration) -> DeclKind {
    let has = |name: &str| decl.decorator(name).is_some();
    if has("Component") {
        return DeclKind::Component;
    }
    if has("Directive") {
        return DeclKind::Directive;
    }
    if has("Pipe") {
        return DeclKind::Pipe;
    }
    if has("NgModule") {
        return DeclKind::Module;
    }
    if decl.calls.iter().any(|c| c.callee == "createEffect") {
        return DeclKind::EffectBlock;
    }
    let guard_heritage = decl
        .heritage
        .iter()
        .any(|h| (h.starts_with("Can") && h.len() > 3) || h == "Resolve");
    if guard_heritage || decl.name.ends_with("Guard") {
        return DeclKind::Guard;
    }
    if has("Injectable") {
        return DeclKind::Service;
    }
    DeclKind::Class
}
