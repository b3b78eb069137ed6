//! Message selectors.
//!
//! A selector names a method by verb and arity and records whether the call
//! is eventual (one-way) or synchronous. Method lookup is keyed by
//! `"verb/arity"`; the eventual flag only matters to receivers that treat the
//! two call modes differently, such as an unresolved promise.

use std::borrow::Cow;
use std::fmt;

/// A verb, an arity and a call mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    verb: Cow<'static, str>,
    arity: usize,
    eventual: bool,
}

/// `run/1`, the verb reactors and callbacks answer.
pub const RUN: Selector = Selector::constant("run", 1, false);

/// `__printOn/1`, asks a value to print itself onto a sink.
pub const PRINT_ON: Selector = Selector::constant("__printOn", 1, false);

/// `print/1`, appends text to a sink.
pub const PRINT: Selector = Selector::constant("print", 1, false);

/// Eventual `whenMoreResolved/1`, attaches a when-resolved reactor.
pub const WHEN_MORE_RESOLVED: Selector = Selector::constant("whenMoreResolved", 1, true);

/// Eventual `whenBroken/1`, attaches a when-broken reactor.
pub const WHEN_BROKEN: Selector = Selector::constant("whenBroken", 1, true);

/// `resolve/1`, strict settlement through a resolver.
pub const RESOLVE: Selector = Selector::constant("resolve", 1, false);

/// `resolve/2`, settlement with an explicit strict flag.
pub const RESOLVE_STRICT: Selector = Selector::constant("resolve", 2, false);

/// `smash/1`, settles a resolver's reference to a broken reference.
pub const SMASH: Selector = Selector::constant("smash", 1, false);

/// `get/1`, indexed access on lists.
pub const GET: Selector = Selector::constant("get", 1, false);

impl Selector {
    const fn constant(verb: &'static str, arity: usize, eventual: bool) -> Self {
        Self {
            verb: Cow::Borrowed(verb),
            arity,
            eventual,
        }
    }

    /// Create a synchronous selector.
    pub fn new(verb: impl Into<Cow<'static, str>>, arity: usize) -> Self {
        Self {
            verb: verb.into(),
            arity,
            eventual: false,
        }
    }

    /// Create an eventual (one-way) selector.
    pub fn eventual(verb: impl Into<Cow<'static, str>>, arity: usize) -> Self {
        Self {
            verb: verb.into(),
            arity,
            eventual: true,
        }
    }

    /// The method verb.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Number of arguments the method takes.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// True for one-way sends.
    pub fn is_eventual(&self) -> bool {
        self.eventual
    }

    /// Method-table key, `"verb/arity"`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.verb, self.arity)
    }

    /// Check verb and arity, ignoring the call mode.
    pub fn is(&self, verb: &str, arity: usize) -> bool {
        self.arity == arity && self.verb == verb
    }

    /// Same method as `other`, ignoring the call mode.
    pub fn same_method(&self, other: &Selector) -> bool {
        self.is(other.verb(), other.arity())
    }

    /// This selector in eventual mode.
    pub fn as_eventual(&self) -> Selector {
        Selector {
            eventual: true,
            ..self.clone()
        }
    }

    /// This selector in synchronous mode.
    pub fn as_sync(&self) -> Selector {
        Selector {
            eventual: false,
            ..self.clone()
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.eventual {
            write!(f, "<-{}/{}", self.verb, self.arity)
        } else {
            write!(f, "{}/{}", self.verb, self.arity)
        }
    }
}
