//! Eventual references and their settlement.
//!
//! This module provides:
//! - [`Promise`]: the switchable reference, a cell that buffers eventual sends
//!   until it is settled and then forwards everything to its target
//! - [`Resolver`]: the one-shot capability that settles a promise
//! - [`Broken`]: a terminal reference carrying a failure
//! - resolution helpers shared by the facade and the reactors
//!
//! # State Transitions
//!
//! ```text
//! Unresolved ──set_target──▶ Targeted ──commit──▶ Committing ──▶ Resolved(final)
//!     │  ▲                                            │
//!     │  └── RefLoop (direct self target)             └──▶ Resolved(broken: forwarding loop)
//!     └── eventual sends buffered
//! ```
//!
//! `Targeted` is the window in which buffered messages are replayed against
//! the immediately known target. `Committing` is the transient marker that
//! makes a cycle back to the reference visible while the chain is flattened.

mod broken;
mod buffer;
mod promise;
mod resolver;

pub use broken::{Broken, FORWARDING_LOOP};
pub use promise::Promise;
pub use resolver::Resolver;

use crate::error::RefError;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derived resolution state of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionState {
    /// An unresolved promise, or one forwarding to an unresolved promise.
    Eventual,
    /// Settled to a value that is not broken.
    Near,
    /// Settled to a broken reference.
    Broken,
}

impl ResolutionState {
    /// Upper-case name, as answered by the `state/1` message.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionState::Eventual => "EVENTUAL",
            ResolutionState::Near => "NEAR",
            ResolutionState::Broken => "BROKEN",
        }
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution state of any value.
///
/// Non-reference values are `Near`, a directly held broken reference is
/// `Broken`, and promises walk their target chain.
pub fn state_of(value: &Value) -> ResolutionState {
    match value {
        Value::Promise(promise) => promise.state(),
        Value::Broken(_) => ResolutionState::Broken,
        _ => ResolutionState::Near,
    }
}

/// One forwarding hop: the stored target of a settled promise, else the
/// value itself.
pub fn chain_target(value: &Value) -> Value {
    match value {
        Value::Promise(promise) => match promise.hop() {
            promise::Hop::Stay => value.clone(),
            promise::Hop::Next(target) => target,
            promise::Hop::Loop => Value::broken(FORWARDING_LOOP),
        },
        _ => value.clone(),
    }
}

/// Follow the forwarding chain as far as it currently goes.
///
/// Stops at the first non-reference value or still-switchable promise.
pub fn resolve_fully(value: &Value) -> Value {
    let mut current = value.clone();
    loop {
        let next = chain_target(&current);
        if next.same(&current) {
            return current;
        }
        current = next;
    }
}

/// Whether a value is settled. True for every non-reference value.
pub fn is_resolved(value: &Value) -> bool {
    match value {
        Value::Promise(promise) => promise.is_resolved(),
        _ => true,
    }
}

/// Whether a reference is settled.
///
/// # Errors
///
/// [`RefError::CantHappen`] when `value` is not a reference; callers are
/// expected to check with [`Value::is_reference`] first.
pub fn ref_is_resolved(value: &Value) -> Result<bool, RefError> {
    match value {
        Value::Promise(promise) => Ok(promise.is_resolved()),
        other => Err(RefError::CantHappen(format!(
            "called isResolved on a non-ref: {}",
            other
        ))),
    }
}
