//! Typed facts extracted from a source model.
//!
//! A [`Fact`] is an atomic observation ("this effect writes signal `count`",
//! "this subscription is never piped through a disposal operator") that rule
//! matchers consume. Facts are immutable once emitted and live for a single
//! analysis pass.

mod change_detection;
mod extract;
mod providers;
mod reactive;
mod state;
mod streams;
mod subscriptions;
mod template;

pub use extract::{ExtractError, FactExtractor};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{BindingId, DeclId, MemberId, Span};

macro_rules! fact_kinds {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)*) => {
        /// Closed set of fact kinds the extractor knows about.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum FactKind {
            $($(#[$doc])* $variant,)*
        }

        impl FactKind {
            /// Every fact kind, in declaration order.
            pub const ALL: &'static [FactKind] = &[$(FactKind::$variant,)*];

            /// Kebab-case name used in declarative rules and reports.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $(FactKind::$variant => $name,)*
                }
            }
        }

        impl FromStr for FactKind {
            type Err = UnknownFactKind;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(FactKind::$variant),)*
                    _ => Err(UnknownFactKind(s.to_string())),
                }
            }
        }
    };
}

fact_kinds! {
    /// A class member exists (`name`, `member_kind`, `input`, `shared`).
    MemberDeclared => "member-declared",
    /// A writable or read-only signal is declared (`signal`, `writable`).
    SignalDeclared => "signal-declared",
    /// A `computed` signal is declared (`signal`).
    ComputedDeclared => "computed-declared",
    /// An `effect(...)` block is declared (`effect`).
    EffectDeclared => "effect-declared",
    /// A signal is read by calling it (`signal`, `effect`, `untracked`).
    SignalRead => "signal-read",
    /// A signal is written with `set`/`update` (`signal`, `op`, `effect`).
    SignalWritten => "signal-written",
    /// `.subscribe(...)` is called (`source`, `disposed_inline`, `stored_in`, `nested`).
    SubscriptionCreated => "subscription-created",
    /// A subscription is kept in a field or local (`field`; locals are
    /// keyed `<member>/<name>`).
    SubscriptionStored => "subscription-stored",
    /// A stored subscription is unsubscribed (`field`, `in_teardown`).
    SubscriptionDisposed => "subscription-disposed",
    /// A teardown hook exists (`hook`).
    TeardownHook => "teardown-hook",
    /// A function is called from a template expression (`callee`, `binding_kind`, `signal`).
    TemplateCall => "template-call",
    /// A pipe class is declared (`name`, `pure`).
    PipeDeclared => "pipe-declared",
    /// A pipe is applied in a template (`pipe`, `source`).
    PipeUsage => "pipe-usage",
    /// A structural directive or control-flow block is used (`directive`).
    StructuralDirective => "structural-directive",
    /// A template loop has no identity key function (`directive`).
    IterationWithoutKey => "iteration-without-key",
    /// One element carries several structural directives (`directives`, `count`).
    StackedStructuralDirectives => "stacked-structural-directives",
    /// An object literal initializes a state container (`name`, `depth`, `wrapper`).
    StateContainer => "state-container",
    /// A state field duplicates or derives from another field (`container`, `field`, `derived_from`, `reason`).
    DerivableStateField => "derivable-state-field",
    /// A parameter object is mutated in place (`root`, `path`, `hops`, `in_reducer`, `immer`).
    ParameterMutation => "parameter-mutation",
    /// A network call runs inside a flattening operator (`operator`, `verb`, `mutating`, `target`).
    FlattenedNetworkCall => "flattened-network-call",
    /// A replaying multicast is created (`operator`, `bounded`).
    ReplayBuffer => "replay-buffer",
    /// A component's change-detection strategy (`strategy`).
    DetectionStrategy => "detection-strategy",
    /// A field's nested state is mutated in place (`field`, `path`, `input`, `strategy`).
    NestedFieldMutation => "nested-field-mutation",
    /// Change detection is requested explicitly (`method`).
    RecomputeRequested => "recompute-requested",
    /// A provider is registered on a declaration (`token`, `host`).
    ProviderRegistered => "provider-registered",
    /// A service is provided in the root injector (`name`).
    RootProvidedService => "root-provided-service",
    /// The DOM sanitizer is bypassed (`method`, `literal_arg`).
    SanitizerBypass => "sanitizer-bypass",
    /// Raw HTML is written into the DOM (`property`).
    DomHtmlWrite => "dom-html-write",
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized fact kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fact kind `{0}`")]
pub struct UnknownFactKind(pub String);

/// A payload value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean flag.
    Bool(bool),
    /// Integer (counts, depths, ids).
    Int(i64),
    /// Text.
    Str(String),
}

impl Value {
    /// Returns the integer, if this is one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Entities a fact is about. All ids refer to the fact's own unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subject {
    /// Owning declaration.
    pub declaration: DeclId,
    /// Member, when the fact is about or inside one.
    pub member: Option<MemberId>,
    /// Template binding, for template facts.
    pub binding: Option<BindingId>,
}

impl Subject {
    /// Subject for a whole declaration.
    #[must_use]
    pub fn declaration(declaration: DeclId) -> Self {
        Self {
            declaration,
            member: None,
            binding: None,
        }
    }

    /// Narrows the subject to a member.
    #[must_use]
    pub fn with_member(mut self, member: Option<MemberId>) -> Self {
        self.member = member;
        self
    }

    /// Narrows the subject to a template binding.
    #[must_use]
    pub fn with_binding(mut self, binding: BindingId) -> Self {
        self.binding = Some(binding);
        self
    }
}

/// Payload key resolving to the subject's declaration id.
pub const KEY_DECLARATION: &str = "@declaration";
/// Payload key resolving to the subject's member id.
pub const KEY_MEMBER: &str = "@member";
/// Payload key resolving to the subject's binding id.
pub const KEY_BINDING: &str = "@binding";

/// An atomic, typed observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    /// Fact kind.
    pub kind: FactKind,
    /// What the fact is about.
    pub subject: Subject,
    /// Where it was observed.
    pub span: Span,
    /// Free-form key/value payload.
    pub payload: BTreeMap<String, Value>,
}

impl Fact {
    /// Creates a fact with an empty payload.
    #[must_use]
    pub fn new(kind: FactKind, subject: Subject, span: Span) -> Self {
        Self {
            kind,
            subject,
            span,
            payload: BTreeMap::new(),
        }
    }

    /// Adds a payload entry.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Adds a payload entry when the value is present.
    #[must_use]
    pub fn with_opt(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    /// Resolves a payload key or one of the `@` subject keys.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            KEY_DECLARATION => Some(self.subject.declaration.0.into()),
            KEY_MEMBER => self.subject.member.map(|m| m.0.into()),
            KEY_BINDING => self.subject.binding.map(|b| b.0.into()),
            _ => self.payload.get(key).cloned(),
        }
    }

    /// Payload text for a key, if it is a string.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.payload.get(key) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }
}
