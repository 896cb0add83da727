//! Collects calls, property writes and object literals from code bodies.

use ngcheck_core::model::{
    ArgKind, Argument, Call, CallId, CallScope, LineIndex, LiteralField, MemberId, ObjectLiteral,
    PropertyWrite, RootKind, ValueShape, WriteOp,
};
use tree_sitter::Node;

use crate::syntax::{
    bound_names, collapse, compact, is_function, key_text, named_children, parameter_names,
    parameters, span, text, unwrap_expression,
};

/// Array methods that mutate their receiver in place.
const MUTATORS: &[&str] = &[
    "push", "pop", "shift", "unshift", "splice", "sort", "reverse", "fill", "copyWithin",
];

/// Names bound by one function.
#[derive(Debug, Default)]
struct Frame {
    params: Vec<String>,
    locals: Vec<String>,
}

/// How an expression's value is consumed by its parent.
#[derive(Debug, Clone)]
enum Link {
    None,
    ArgumentOf(CallId),
    AssignedTo(Vec<String>),
}

/// Walks the code of one declaration.
///
/// Calls get ids in pre-order, so an outer call always precedes the calls in
/// its receiver and arguments.
pub(crate) struct Collector<'s> {
    src: &'s str,
    index: &'s LineIndex,
    pub(crate) calls: Vec<Call>,
    pub(crate) writes: Vec<PropertyWrite>,
    pub(crate) literals: Vec<ObjectLiteral>,
    member: Option<MemberId>,
    scopes: Vec<CallScope>,
    frames: Vec<Frame>,
}

impl<'s> Collector<'s> {
    pub(crate) fn new(src: &'s str, index: &'s LineIndex) -> Self {
        Self {
            src,
            index,
            calls: Vec::new(),
            writes: Vec::new(),
            literals: Vec::new(),
            member: None,
            scopes: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Attributes everything collected from now on to `member`.
    pub(crate) fn set_member(&mut self, member: Option<MemberId>) {
        self.member = member;
    }

    /// Walks a function body with its parameters in scope.
    pub(crate) fn function(&mut self, params: Option<Node<'_>>, body: Option<Node<'_>>) {
        let params = params.map(|p| parameter_names(p, self.src)).unwrap_or_default();
        self.frames.push(Frame {
            params,
            locals: Vec::new(),
        });
        if let Some(body) = body {
            self.visit(body, Link::None);
        }
        self.frames.pop();
    }

    /// Walks an initializer whose value is stored in `target`.
    pub(crate) fn initializer(&mut self, owner: &str, target: Vec<String>, value: Node<'_>) {
        self.object_literal(owner, value);
        self.visit(value, Link::AssignedTo(target));
    }

    fn visit(&mut self, node: Node<'_>, link: Link) {
        match node.kind() {
            "call_expression" => self.call(node, link),
            "new_expression" => self.new_expression(node, link),
            "assignment_expression" | "augmented_assignment_expression" => self.assignment(node),
            "update_expression" => {
                if let Some(argument) = node.child_by_field_name("argument") {
                    self.write_path(argument, WriteOp::Update, node);
                }
            }
            "unary_expression" => {
                let argument = node.child_by_field_name("argument");
                let is_delete = node
                    .child_by_field_name("operator")
                    .is_some_and(|op| text(op, self.src) == "delete");
                match argument {
                    Some(argument) if is_delete => self.write_path(argument, WriteOp::Delete, node),
                    _ => self.visit_children(node),
                }
            }
            "variable_declarator" => self.declarator(node),
            "parenthesized_expression" | "as_expression" | "satisfies_expression"
            | "non_null_expression" => {
                let mut children = named_children(node).into_iter();
                if let Some(inner) = children.next() {
                    self.visit(inner, link);
                }
                for rest in children {
                    self.visit(rest, Link::None);
                }
            }
            _ if is_function(node) => {
                self.function(parameters(node), node.child_by_field_name("body"));
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        for child in named_children(node) {
            self.visit(child, Link::None);
        }
    }

    fn call(&mut self, node: Node<'_>, link: Link) {
        let Some(function) = node.child_by_field_name("function") else {
            self.visit_children(node);
            return;
        };
        let (callee, method, receiver) = match function.kind() {
            "member_expression" => {
                let property = function
                    .child_by_field_name("property")
                    .map_or_else(String::new, |p| text(p, self.src).to_string());
                (
                    compact(function, self.src),
                    property,
                    function.child_by_field_name("object"),
                )
            }
            _ => {
                let callee = compact(function, self.src);
                (callee.clone(), callee, None)
            }
        };
        let (source, operators) = match receiver {
            Some(object) => {
                let (source, operators) = self.upstream(object);
                (Some(source), operators)
            }
            None => (None, Vec::new()),
        };
        let arguments = node
            .child_by_field_name("arguments")
            .filter(|a| a.kind() == "arguments")
            .map(named_children)
            .unwrap_or_default();

        let call = Call {
            id: CallId(0),
            member: self.member,
            callee: callee.clone(),
            method: method.clone(),
            receiver: receiver.map(|r| compact(r, self.src)),
            source,
            operators,
            arguments: arguments.iter().map(|a| self.argument(*a)).collect(),
            scopes: self.scopes.clone(),
            argument_of: None,
            assigned_to: None,
            is_new: false,
            span: span(node, self.index),
        };
        let id = self.push_call(call, link);

        if MUTATORS.contains(&method.as_str()) {
            if let Some(object) = receiver {
                self.write_path(object, WriteOp::Mutator(method.clone()), node);
            }
        }

        match receiver {
            Some(object) => self.visit(object, Link::None),
            None if function.kind() != "identifier" => self.visit(function, Link::None),
            None => {}
        }
        self.arguments(id, &callee, &method, &arguments);
    }

    fn new_expression(&mut self, node: Node<'_>, link: Link) {
        let constructor = node
            .child_by_field_name("constructor")
            .map_or_else(String::new, |c| compact(c, self.src));
        let method = constructor
            .rsplit('.')
            .next()
            .unwrap_or(constructor.as_str())
            .to_string();
        let arguments = node
            .child_by_field_name("arguments")
            .map(named_children)
            .unwrap_or_default();

        let call = Call {
            id: CallId(0),
            member: self.member,
            callee: constructor.clone(),
            method: method.clone(),
            receiver: None,
            source: None,
            operators: Vec::new(),
            arguments: arguments.iter().map(|a| self.argument(*a)).collect(),
            scopes: self.scopes.clone(),
            argument_of: None,
            assigned_to: None,
            is_new: true,
            span: span(node, self.index),
        };
        let id = self.push_call(call, link);
        self.arguments(id, &constructor, &method, &arguments);
    }

    fn push_call(&mut self, mut call: Call, link: Link) -> CallId {
        let id = CallId(self.calls.len());
        call.id = id;
        match link {
            Link::None => {}
            Link::ArgumentOf(parent) => call.argument_of = Some(parent),
            Link::AssignedTo(target) => call.assigned_to = Some(target),
        }
        self.calls.push(call);
        id
    }

    /// Walks call arguments; function arguments open a callback scope.
    fn arguments(&mut self, id: CallId, callee: &str, method: &str, arguments: &[Node<'_>]) {
        for arg in arguments {
            if is_function(*arg) {
                self.scopes.push(CallScope {
                    call: id,
                    callee: callee.to_string(),
                    method: method.to_string(),
                });
                self.function(parameters(*arg), arg.child_by_field_name("body"));
                self.scopes.pop();
            } else {
                self.visit(*arg, Link::ArgumentOf(id));
            }
        }
    }

    fn argument(&self, node: Node<'_>) -> Argument {
        let inner = unwrap_expression(node);
        let kind = match inner.kind() {
            _ if is_function(inner) => ArgKind::Function,
            "object" => ArgKind::Object,
            "string" | "template_string" | "number" | "true" | "false" | "null" | "undefined" => {
                ArgKind::Literal
            }
            _ => ArgKind::Expression,
        };
        Argument {
            text: collapse(node, self.src),
            kind,
        }
    }

    /// Unwinds `.pipe(...)` stages below a receiver, returning the innermost
    /// source and the operators in application order.
    fn upstream(&self, receiver: Node<'_>) -> (String, Vec<String>) {
        let mut operators = Vec::new();
        let mut current = unwrap_expression(receiver);
        while let Some((object, stage)) = self.pipe_stage(current) {
            let mut ops: Vec<String> = stage.iter().filter_map(|a| self.operator_name(*a)).collect();
            ops.append(&mut operators);
            operators = ops;
            current = unwrap_expression(object);
        }
        let source = compact(current, self.src);
        let source = source.strip_prefix("this.").unwrap_or(&source).to_string();
        (source, operators)
    }

    /// `object.pipe(args)` split into its object and arguments.
    fn pipe_stage<'t>(&self, node: Node<'t>) -> Option<(Node<'t>, Vec<Node<'t>>)> {
        if node.kind() != "call_expression" {
            return None;
        }
        let function = node.child_by_field_name("function")?;
        if function.kind() != "member_expression" {
            return None;
        }
        let property = function.child_by_field_name("property")?;
        if text(property, self.src) != "pipe" {
            return None;
        }
        let object = function.child_by_field_name("object")?;
        let args = node
            .child_by_field_name("arguments")
            .map(named_children)
            .unwrap_or_default();
        Some((object, args))
    }

    /// Name of an operator applied in a `.pipe(...)` stage.
    fn operator_name(&self, arg: Node<'_>) -> Option<String> {
        let arg = unwrap_expression(arg);
        let function = match arg.kind() {
            "call_expression" => arg.child_by_field_name("function")?,
            "identifier" | "member_expression" => arg,
            _ => return None,
        };
        let name = match function.kind() {
            "member_expression" => text(function.child_by_field_name("property")?, self.src),
            _ => text(function, self.src),
        };
        Some(name.to_string())
    }

    fn assignment(&mut self, node: Node<'_>) {
        let left = node.child_by_field_name("left");
        let target = left.and_then(|l| self.path(l));
        if let Some(left) = left {
            if target.as_ref().is_some_and(|t| t.len() >= 2) {
                self.write_path(left, WriteOp::Assign, node);
            }
        }
        if let Some(right) = node.child_by_field_name("right") {
            self.object_literal(
                target.as_ref().and_then(|t| t.last()).map_or("", String::as_str),
                right,
            );
            let link = target.map_or(Link::None, Link::AssignedTo);
            self.visit(right, link);
        }
    }

    fn declarator(&mut self, node: Node<'_>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let mut names = Vec::new();
        bound_names(name, self.src, &mut names);
        if let Some(frame) = self.frames.last_mut() {
            frame.locals.extend(names.iter().cloned());
        }
        if let Some(value) = node.child_by_field_name("value") {
            let owner = text(name, self.src).to_string();
            let target = if names.len() == 1 { names } else { Vec::new() };
            if target.is_empty() {
                self.visit(value, Link::None);
            } else {
                self.initializer(&owner, target, value);
            }
        }
    }

    /// Records a write when `target` is a plain property path.
    fn write_path(&mut self, target: Node<'_>, op: WriteOp, node: Node<'_>) {
        let Some(path) = self.path(target) else {
            return;
        };
        let hops = path.len().saturating_sub(1) + usize::from(matches!(op, WriteOp::Mutator(_)));
        if hops == 0 {
            return;
        }
        let root = self.root_kind(&path[0]);
        self.writes.push(PropertyWrite {
            member: self.member,
            target: path,
            root,
            op,
            scopes: self.scopes.clone(),
            span: span(node, self.index),
        });
    }

    /// Property path of an lvalue-like expression; computed keys become `[]`.
    fn path(&self, node: Node<'_>) -> Option<Vec<String>> {
        match node.kind() {
            "this" => Some(vec!["this".to_string()]),
            "identifier" => Some(vec![text(node, self.src).to_string()]),
            "member_expression" => {
                let mut path = self.path(node.child_by_field_name("object")?)?;
                path.push(text(node.child_by_field_name("property")?, self.src).to_string());
                Some(path)
            }
            "subscript_expression" => {
                let mut path = self.path(node.child_by_field_name("object")?)?;
                path.push("[]".to_string());
                Some(path)
            }
            "non_null_expression" | "parenthesized_expression" => {
                self.path(named_children(node).into_iter().next()?)
            }
            _ => None,
        }
    }

    fn root_kind(&self, name: &str) -> RootKind {
        if name == "this" {
            return RootKind::This;
        }
        for frame in self.frames.iter().rev() {
            if frame.locals.iter().any(|l| l == name) {
                return RootKind::Local;
            }
            if frame.params.iter().any(|p| p == name) {
                return RootKind::Parameter;
            }
        }
        RootKind::Free
    }

    /// Records an object literal initializer, bare or as the first object
    /// argument of a wrapping call.
    fn object_literal(&mut self, owner: &str, value: Node<'_>) {
        let value = unwrap_expression(value);
        let (wrapper, object) = match value.kind() {
            "object" => (None, value),
            "call_expression" | "new_expression" => {
                let (field, prefix) = if value.kind() == "call_expression" {
                    ("function", "")
                } else {
                    ("constructor", "new ")
                };
                let Some(callee) = value.child_by_field_name(field) else {
                    return;
                };
                let first_object = value
                    .child_by_field_name("arguments")
                    .map(named_children)
                    .unwrap_or_default()
                    .into_iter()
                    .map(unwrap_expression)
                    .find(|a| a.kind() == "object");
                let Some(object) = first_object else {
                    return;
                };
                (Some(format!("{prefix}{}", compact(callee, self.src))), object)
            }
            _ => return,
        };
        let mut fields = Vec::new();
        let depth = self.flatten(object, &[], 1, &mut fields);
        self.literals.push(ObjectLiteral {
            owner: owner.to_string(),
            wrapper,
            member: self.member,
            fields,
            depth,
            span: span(object, self.index),
        });
    }

    /// Flattens an object literal's fields; returns the deepest object level.
    fn flatten(
        &self,
        object: Node<'_>,
        prefix: &[String],
        depth: usize,
        fields: &mut Vec<LiteralField>,
    ) -> usize {
        let mut deepest = depth;
        for child in named_children(object) {
            let (key, value) = match child.kind() {
                "pair" => {
                    let Some(key) = child.child_by_field_name("key") else {
                        continue;
                    };
                    (key_text(key, self.src), child.child_by_field_name("value"))
                }
                "shorthand_property_identifier" => (text(child, self.src).to_string(), None),
                _ => continue,
            };
            let mut path = prefix.to_vec();
            path.push(key);
            let value = value.map(unwrap_expression);
            fields.push(LiteralField {
                path: path.clone(),
                shape: value.map_or(ValueShape::Scalar, shape),
            });
            deepest = deepest.max(self.nested(value, &path, depth, fields));
        }
        deepest
    }

    fn nested(
        &self,
        value: Option<Node<'_>>,
        path: &[String],
        depth: usize,
        fields: &mut Vec<LiteralField>,
    ) -> usize {
        let Some(value) = value else {
            return depth;
        };
        match value.kind() {
            "object" => self.flatten(value, path, depth + 1, fields),
            "array" => {
                let mut element_path = path.to_vec();
                element_path.push("[]".to_string());
                named_children(value)
                    .into_iter()
                    .map(|el| {
                        self.nested(Some(unwrap_expression(el)), &element_path, depth, fields)
                    })
                    .max()
                    .unwrap_or(depth)
            }
            _ => depth,
        }
    }
}

fn shape(value: Node<'_>) -> ValueShape {
    match value.kind() {
        "array" => ValueShape::Array,
        "object" => ValueShape::Object,
        "null" | "undefined" => ValueShape::Null,
        _ => ValueShape::Scalar,
    }
}
