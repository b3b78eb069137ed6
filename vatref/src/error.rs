//! Error types for promise resolution and vat configuration.

use crate::value::Value;
use thiserror::Error;

/// Failures raised by reference dispatch, settlement and inspection.
///
/// Every variant is an ordinary call failure: it travels back to the caller as
/// the `Err` side of a call, and reactors convert it into a broken reference
/// (see [`RefError::into_problem`]) instead of letting it escape.
#[derive(Debug, Error)]
pub enum RefError {
    /// Synchronous call attempted on an unresolved promise.
    #[error("not synchronously callable: {verb}/{arity}")]
    NotSynchronouslyCallable {
        /// Verb of the rejected selector.
        verb: String,
        /// Arity of the rejected selector.
        arity: usize,
    },

    /// Strict resolve on a resolver that was already used.
    #[error("Already resolved")]
    AlreadyResolved,

    /// Target set on a reference that already left the switchable state.
    #[error("No longer switchable")]
    NoLongerSwitchable,

    /// A reference would resolve to (a chain ending at) itself.
    #[error("Ref loop")]
    RefLoop,

    /// Fulfillment requested on a reference that is still eventual.
    #[error("Not resolved: {0}")]
    NotYetResolved(Value),

    /// The stored problem of a broken reference, re-raised.
    #[error("{0}")]
    Problem(Value),

    /// The receiver has no method for this selector.
    #[error("no such method: {verb}/{arity}")]
    NoSuchMethod {
        /// Verb of the unanswered selector.
        verb: String,
        /// Arity of the unanswered selector.
        arity: usize,
    },

    /// The vat driving a pending outcome went away before it settled.
    #[error("vat dropped before the reference settled")]
    Abandoned,

    /// Internal invariant violation in the reference core.
    #[error("Can't happen: {0}")]
    CantHappen(String),

    /// Vat configuration failed to load or validate.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RefError {
    /// Convert this failure into the problem value a broken reference stores.
    ///
    /// A re-raised [`RefError::Problem`] hands back its original payload so
    /// the same problem flows unchanged through chains of broken references.
    /// Every other failure becomes its display string.
    pub fn into_problem(self) -> Value {
        match self {
            RefError::Problem(problem) => problem,
            other => Value::from(other.to_string()),
        }
    }

    pub(crate) fn no_such_method(selector: &crate::selector::Selector) -> Self {
        RefError::NoSuchMethod {
            verb: selector.verb().to_string(),
            arity: selector.arity(),
        }
    }
}

/// Errors related to [`VatConfig`](crate::config::VatConfig) loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration text was not valid JSON for the expected shape.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field held a value outside its accepted range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
