//! Language-agnostic source model.
//!
//! A parser front end (see [`crate::LanguageFrontend`]) turns one source file
//! into a [`SourceModel`]: the declarations it contains, their members, the
//! calls and property writes inside them, decorator metadata and template
//! bindings. The fact extractor only ever looks at this model, never at a
//! concrete syntax tree.

use std::path::{Path, PathBuf};

/// A byte range in a source file, with the line/column of its start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    /// Byte offset of the first byte.
    pub offset: usize,
    /// Length in bytes.
    pub length: usize,
    /// Line of the first byte (1-indexed).
    pub line: usize,
    /// Column of the first byte (1-indexed, in bytes).
    pub column: usize,
}

impl Span {
    /// Creates a span from explicit values.
    #[must_use]
    pub fn new(offset: usize, length: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            length,
            line,
            column,
        }
    }
}

/// Maps byte offsets to line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Builds the index for a text.
    #[must_use]
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    /// Returns the 1-indexed `(line, column)` of a byte offset.
    #[must_use]
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let start = self.line_starts.get(line).copied().unwrap_or(0);
        (line + 1, offset - start + 1)
    }

    /// Builds a span for `offset..offset + length`.
    #[must_use]
    pub fn span(&self, offset: usize, length: usize) -> Span {
        let (line, column) = self.position(offset);
        Span::new(offset, length, line, column)
    }
}

/// Index of a declaration within its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub usize);

/// Index of a member within its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(pub usize);

/// Index of a template binding within its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub usize);

/// Index of a call within its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(pub usize);

/// One input file together with its parsed model.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Path as given to the analyzer.
    pub path: PathBuf,
    /// Path relative to the analysis root, used in diagnostics.
    pub relative_path: PathBuf,
    /// Raw file contents.
    pub text: String,
    /// Parsed model, owned by this unit.
    pub model: SourceModel,
}

impl SourceUnit {
    /// Creates a unit whose relative path is computed against `root`.
    #[must_use]
    pub fn new(path: &Path, root: &Path, text: String, model: SourceModel) -> Self {
        let relative_path = path
            .strip_prefix(root)
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf);
        Self {
            path: path.to_path_buf(),
            relative_path,
            text,
            model,
        }
    }

    /// Looks up a declaration by id.
    #[must_use]
    pub fn declaration(&self, id: DeclId) -> Option<&Declaration> {
        self.model.declarations.get(id.0)
    }
}

/// A syntax error reported by the parser front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Where the error starts.
    pub span: Span,
    /// Parser description of the problem.
    pub message: String,
}

/// Structural facts of one source file.
#[derive(Debug, Clone, Default)]
pub struct SourceModel {
    /// Declarations in source order.
    pub declarations: Vec<Declaration>,
    /// Syntax errors; a non-empty list makes the model malformed.
    pub syntax_errors: Vec<SyntaxError>,
}

impl SourceModel {
    /// Returns true if the parser reported any syntax error.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        !self.syntax_errors.is_empty()
    }
}

/// Kind of a named construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    /// `@Component` class.
    Component,
    /// `@Directive` class.
    Directive,
    /// `@Injectable` class.
    Service,
    /// `@Pipe` class.
    Pipe,
    /// `@NgModule` class.
    Module,
    /// Store reducer (`createReducer`, `*Reducer` function).
    Reducer,
    /// Store selector (`createSelector`).
    Selector,
    /// Route guard (class or functional).
    Guard,
    /// Class holding `createEffect` streams.
    EffectBlock,
    /// Plain top-level function.
    Function,
    /// Plain top-level constant.
    Constant,
    /// Undecorated class.
    Class,
}

impl DeclKind {
    /// Lowercase name used in fact payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Directive => "directive",
            Self::Service => "service",
            Self::Pipe => "pipe",
            Self::Module => "module",
            Self::Reducer => "reducer",
            Self::Selector => "selector",
            Self::Guard => "guard",
            Self::EffectBlock => "effect-block",
            Self::Function => "function",
            Self::Constant => "constant",
            Self::Class => "class",
        }
    }

    /// Returns true for classes that own a view.
    #[must_use]
    pub fn has_view(self) -> bool {
        matches!(self, Self::Component | Self::Directive)
    }
}

/// A named construct and everything it owns.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// Position in [`SourceModel::declarations`].
    pub id: DeclId,
    /// What this declaration is.
    pub kind: DeclKind,
    /// Declared name.
    pub name: String,
    /// Whole declaration.
    pub span: Span,
    /// Class-level decorators.
    pub decorators: Vec<Decorator>,
    /// Names from `extends` / `implements` clauses.
    pub heritage: Vec<String>,
    /// Parameter names of function-like declarations.
    pub parameters: Vec<String>,
    /// Fields, methods, constructor and parameter properties.
    pub members: Vec<Member>,
    /// Inline template, if any.
    pub template: Option<Template>,
    /// Template bindings, owned exclusively by this declaration.
    pub bindings: Vec<Binding>,
    /// Calls and `new` expressions, in source order.
    pub calls: Vec<Call>,
    /// Property writes, in source order.
    pub writes: Vec<PropertyWrite>,
    /// Object literals used as initializers.
    pub literals: Vec<ObjectLiteral>,
}

impl Declaration {
    /// Creates an empty declaration.
    #[must_use]
    pub fn new(id: DeclId, kind: DeclKind, name: impl Into<String>, span: Span) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            span,
            decorators: Vec::new(),
            heritage: Vec::new(),
            parameters: Vec::new(),
            members: Vec::new(),
            template: None,
            bindings: Vec::new(),
            calls: Vec::new(),
            writes: Vec::new(),
            literals: Vec::new(),
        }
    }

    /// Finds a class-level decorator by name.
    #[must_use]
    pub fn decorator(&self, name: &str) -> Option<&Decorator> {
        self.decorators.iter().find(|d| d.name == name)
    }

    /// Finds a member by name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Looks up a call by id.
    #[must_use]
    pub fn call(&self, id: CallId) -> Option<&Call> {
        self.calls.get(id.0)
    }
}

/// Kind of a class member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Property declaration.
    Field,
    /// Method.
    Method,
    /// `constructor`.
    Constructor,
    /// `get` / `set` accessor.
    Accessor,
    /// Constructor parameter property (`private readonly http: HttpClient`).
    Parameter,
}

impl MemberKind {
    /// Lowercase name used in fact payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Accessor => "accessor",
            Self::Parameter => "parameter",
        }
    }
}

/// A property, method, or decorator-bound field.
#[derive(Debug, Clone)]
pub struct Member {
    /// Position in [`Declaration::members`].
    pub id: MemberId,
    /// Member name.
    pub name: String,
    /// Member kind.
    pub kind: MemberKind,
    /// Declared type text, when annotated.
    pub declared_type: Option<String>,
    /// Initializer expression, for fields.
    pub initializer: Option<Initializer>,
    /// Decorators applied to this member.
    pub decorators: Vec<Decorator>,
    /// Parameter names, for methods and constructors.
    pub parameters: Vec<String>,
    /// Whole member.
    pub span: Span,
}

impl Member {
    /// Finds a decorator by name.
    #[must_use]
    pub fn decorator(&self, name: &str) -> Option<&Decorator> {
        self.decorators.iter().find(|d| d.name == name)
    }

    /// Callee of the initializer, when it is a call or `new` expression.
    #[must_use]
    pub fn initializer_callee(&self) -> Option<&str> {
        self.initializer.as_ref().and_then(|i| i.callee.as_deref())
    }
}

/// A field initializer.
#[derive(Debug, Clone)]
pub struct Initializer {
    /// Expression text with whitespace collapsed.
    pub text: String,
    /// Outermost callee (`signal`, `input.required`, `new BehaviorSubject`).
    pub callee: Option<String>,
    /// Expression span.
    pub span: Span,
}

/// A decorator and its arguments.
#[derive(Debug, Clone)]
pub struct Decorator {
    /// Decorator name without `@`.
    pub name: String,
    /// Arguments as literal trees.
    pub arguments: Vec<Literal>,
    /// Decorator span.
    pub span: Span,
}

impl Decorator {
    /// Looks up a property of the first object-literal argument.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Literal> {
        self.arguments.iter().find_map(|arg| arg.get(key))
    }
}

/// A literal value as far as the front end understood it.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// String literal (without quotes).
    Str(String),
    /// Template literal: raw text and the span of the text inside the backticks.
    Template(String, Span),
    /// Number literal text.
    Number(String),
    /// `true` / `false`.
    Bool(bool),
    /// `null` / `undefined`.
    Null,
    /// Identifier or dotted path (`ChangeDetectionStrategy.OnPush`).
    Ident(String),
    /// Array literal.
    Array(Vec<Literal>),
    /// Object literal, in source order.
    Object(Vec<(String, Literal)>),
    /// Anything else, as collapsed source text.
    Other(String),
}

impl Literal {
    /// Looks up a key when this literal is an object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Literal> {
        match self {
            Self::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Text of string-like and identifier literals.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Template(s, _) | Self::Ident(s) | Self::Number(s) | Self::Other(s) => {
                Some(s)
            }
            _ => None,
        }
    }
}

/// An inline component template.
#[derive(Debug, Clone)]
pub struct Template {
    /// Template text.
    pub text: String,
    /// Span of the text in the file.
    pub span: Span,
}

/// Kind of a template binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    /// `{{ expr }}`.
    Interpolation,
    /// `[prop]="expr"` or `[(prop)]="expr"`.
    Property,
    /// `(event)="expr"`.
    Event,
    /// `*ngFor="..."`, `*ngIf="..."`.
    Structural,
    /// `@for (...)`, `@if (...)` blocks.
    ControlFlow,
    /// `expr | pipe`.
    Pipe,
}

impl BindingKind {
    /// Lowercase name used in fact payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interpolation => "interpolation",
            Self::Property => "property",
            Self::Event => "event",
            Self::Structural => "structural",
            Self::ControlFlow => "control-flow",
            Self::Pipe => "pipe",
        }
    }
}

/// A template-level construct.
#[derive(Debug, Clone)]
pub struct Binding {
    /// Position in [`Declaration::bindings`].
    pub id: BindingId,
    /// Binding kind.
    pub kind: BindingKind,
    /// Target name: property, event, directive, block or pipe name.
    pub name: String,
    /// Bound expression (for pipes: the piped operand).
    pub expression: String,
    /// Index of the element the binding sits on, in template order.
    pub element: usize,
    /// Location in the file.
    pub span: Span,
}

/// A callback scope enclosing a call or write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallScope {
    /// The call whose function argument encloses the code.
    pub call: CallId,
    /// Callee of that call (`effect`, `switchMap`, `subscribe`).
    pub callee: String,
    /// Method name of that call (last callee segment).
    pub method: String,
}

/// Shape of a call argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Arrow function or function expression.
    Function,
    /// Object literal.
    Object,
    /// String, number, boolean or null literal.
    Literal,
    /// Anything else.
    Expression,
}

/// One call argument.
#[derive(Debug, Clone)]
pub struct Argument {
    /// Collapsed source text.
    pub text: String,
    /// Argument shape.
    pub kind: ArgKind,
}

/// A call or `new` expression.
#[derive(Debug, Clone)]
pub struct Call {
    /// Position in [`Declaration::calls`].
    pub id: CallId,
    /// Enclosing member, for class declarations.
    pub member: Option<MemberId>,
    /// Full callee path (`this.http.post`, `switchMap`, `ReplaySubject`).
    pub callee: String,
    /// Last callee segment (`post`).
    pub method: String,
    /// Receiver text (`this.http`), when called as a method.
    pub receiver: Option<String>,
    /// Upstream source with `.pipe(...)` stages and a leading `this.` removed.
    pub source: Option<String>,
    /// Operators applied by `.pipe(...)` stages in the receiver chain.
    pub operators: Vec<String>,
    /// Arguments.
    pub arguments: Vec<Argument>,
    /// Enclosing callback scopes, outermost first.
    pub scopes: Vec<CallScope>,
    /// The call this call is a direct argument of.
    pub argument_of: Option<CallId>,
    /// Assignment target path when the call result is assigned.
    pub assigned_to: Option<Vec<String>>,
    /// True for `new` expressions.
    pub is_new: bool,
    /// Call span.
    pub span: Span,
}

impl Call {
    /// Innermost enclosing scope whose method is one of `methods`.
    #[must_use]
    pub fn innermost_scope(&self, methods: &[&str]) -> Option<&CallScope> {
        self.scopes
            .iter()
            .rev()
            .find(|s| methods.contains(&s.method.as_str()))
    }

    /// Returns true if any enclosing scope has one of the given methods.
    #[must_use]
    pub fn within(&self, methods: &[&str]) -> bool {
        self.innermost_scope(methods).is_some()
    }
}

/// How the root of a written path is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// `this`.
    This,
    /// A parameter of an enclosing function.
    Parameter,
    /// A local variable of an enclosing function.
    Local,
    /// Anything else (module scope, globals).
    Free,
}

/// Kind of property write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// `a.b = c`, `a.b += c`.
    Assign,
    /// `a.b++`.
    Update,
    /// `delete a.b`.
    Delete,
    /// In-place array mutator (`a.b.push(c)`), with the method name.
    Mutator(String),
}

/// A write to a property path.
#[derive(Debug, Clone)]
pub struct PropertyWrite {
    /// Enclosing member, for class declarations.
    pub member: Option<MemberId>,
    /// Written path (`["this", "user", "name"]`); computed keys are `[]`.
    pub target: Vec<String>,
    /// Binding of `target[0]`.
    pub root: RootKind,
    /// Kind of write.
    pub op: WriteOp,
    /// Enclosing callback scopes, outermost first.
    pub scopes: Vec<CallScope>,
    /// Write span.
    pub span: Span,
}

impl PropertyWrite {
    /// Number of property-access hops from the root to the mutated slot.
    ///
    /// An array mutator mutates the elements of its receiver, one hop below it.
    #[must_use]
    pub fn hops(&self) -> usize {
        let base = self.target.len().saturating_sub(1);
        match self.op {
            WriteOp::Mutator(_) => base + 1,
            _ => base,
        }
    }
}

/// Shape of an object-literal field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Array literal.
    Array,
    /// Nested object literal.
    Object,
    /// `null` / `undefined`.
    Null,
    /// Any other value.
    Scalar,
}

/// One field of an object literal, possibly nested.
#[derive(Debug, Clone)]
pub struct LiteralField {
    /// Key path from the literal root; array elements contribute `[]`.
    pub path: Vec<String>,
    /// Value shape.
    pub shape: ValueShape,
}

impl LiteralField {
    /// Last key of the path.
    #[must_use]
    pub fn key(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }

    /// Returns true for fields directly under the literal root.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.path.len() == 1
    }
}

/// An object literal used as an initializer.
#[derive(Debug, Clone)]
pub struct ObjectLiteral {
    /// Variable or field the literal initializes.
    pub owner: String,
    /// Wrapping callee (`signal`, `new BehaviorSubject`), if any.
    pub wrapper: Option<String>,
    /// Enclosing member, for class fields.
    pub member: Option<MemberId>,
    /// Flattened fields.
    pub fields: Vec<LiteralField>,
    /// Object nesting depth; a flat literal has depth 1.
    pub depth: usize,
    /// Literal span.
    pub span: Span,
}
