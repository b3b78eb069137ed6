//! The reference facade.
//!
//! [`RefFacade`] is the capability the rest of the runtime uses to create
//! promises, inspect resolution, and register reactors. It is usable directly
//! from Rust and as an ordinary object answering the same verbs by message
//! send.
//!
//! | Verb | Rust |
//! |------|------|
//! | `promise/0` | [`RefFacade::promise`] (answers `[promise, resolver]`) |
//! | `isResolved/1` | [`RefFacade::is_resolved`] |
//! | `fulfillment/1` | [`RefFacade::fulfillment`] |
//! | `whenResolved/2` | [`RefFacade::when_resolved`] |
//! | `whenBroken/2` | [`RefFacade::when_broken`] |
//! | `state/1` | [`RefFacade::state`] (answers `"EVENTUAL"`, `"NEAR"` or `"BROKEN"`) |
//! | `isNear/1`, `isEventual/1`, `isBroken/1` | predicates over `state` |
//! | `optProblem/1` | [`RefFacade::opt_problem`] (answers `null` unless broken) |
//! | `broken/1` | [`RefFacade::broken`] |

use crate::error::RefError;
use crate::reactor::Reactor;
use crate::reference::{self, Promise, ResolutionState, Resolver};
use crate::selector::Selector;
use crate::value::{Script, Value};
use crate::vat::Vat;
use std::rc::Rc;

/// Entry point for promise creation and inspection.
///
/// # Example
///
/// ```rust,ignore
/// let refs = RefFacade;
/// let (promise, resolver) = refs.promise();
/// let outcome = refs.when_resolved(&vat, &promise.clone().into(), callback);
///
/// resolver.resolve_strict(&vat, Value::Int(42))?;
/// vat.run_until_idle();
///
/// assert_eq!(refs.fulfillment(&promise.into())?.as_int(), Some(42));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RefFacade;

impl RefFacade {
    /// A fresh promise and its resolver.
    pub fn promise(&self) -> (Promise, Resolver) {
        Promise::pair()
    }

    /// True for every non-reference value and for settled promises.
    pub fn is_resolved(&self, value: &Value) -> bool {
        reference::is_resolved(value)
    }

    /// Resolution state of `value`.
    pub fn state(&self, value: &Value) -> ResolutionState {
        reference::state_of(value)
    }

    /// Settled to something that is not broken.
    pub fn is_near(&self, value: &Value) -> bool {
        self.state(value) == ResolutionState::Near
    }

    /// Not settled yet.
    pub fn is_eventual(&self, value: &Value) -> bool {
        self.state(value) == ResolutionState::Eventual
    }

    /// Settled to a broken reference.
    pub fn is_broken(&self, value: &Value) -> bool {
        self.state(value) == ResolutionState::Broken
    }

    /// The settled value.
    ///
    /// # Errors
    ///
    /// - [`RefError::NotYetResolved`] carrying `value` while it is eventual
    /// - [`RefError::Problem`] re-raising the stored problem when broken
    pub fn fulfillment(&self, value: &Value) -> Result<Value, RefError> {
        match self.state(value) {
            ResolutionState::Eventual => Err(RefError::NotYetResolved(value.clone())),
            ResolutionState::Broken => Err(RefError::Problem(
                self.opt_problem(value).unwrap_or_default(),
            )),
            ResolutionState::Near => Ok(reference::resolve_fully(value)),
        }
    }

    /// The problem of a broken value.
    pub fn opt_problem(&self, value: &Value) -> Option<Value> {
        match reference::resolve_fully(value) {
            Value::Broken(broken) => Some(broken.problem().clone()),
            _ => None,
        }
    }

    /// A broken reference carrying `problem`.
    pub fn broken(&self, problem: Value) -> Value {
        Value::broken(problem)
    }

    /// Call `callback` with `value` once it settles.
    ///
    /// Returns a promise for the callback's outcome. A failing callback
    /// breaks that promise instead of propagating.
    pub fn when_resolved(&self, vat: &Vat, value: &Value, callback: Value) -> Value {
        let (outcome, resolver) = Promise::pair();
        Reactor::when_resolved(callback, value.clone(), Some(resolver)).arm(vat);
        Value::Promise(outcome)
    }

    /// Call `callback` with `value` if it breaks.
    ///
    /// The returned promise settles to the callback's outcome, or to `null`
    /// without calling back when `value` resolves near.
    pub fn when_broken(&self, vat: &Vat, value: &Value, callback: Value) -> Value {
        let (outcome, resolver) = Promise::pair();
        Reactor::when_broken(callback, value.clone(), Some(resolver)).arm(vat);
        Value::Promise(outcome)
    }

    /// Share the facade as a callable value.
    pub fn to_value(self) -> Value {
        Value::Object(Rc::new(self))
    }
}

impl Script for RefFacade {
    fn name(&self) -> &str {
        "Ref"
    }

    fn dispatch(&self, vat: &Vat, selector: &Selector, args: &[Value]) -> Result<Value, RefError> {
        match (selector.verb(), selector.arity()) {
            ("promise", 0) => {
                let (promise, resolver) = self.promise();
                Ok(Value::list([Value::from(promise), Value::from(resolver)]))
            }
            ("isResolved", 1) => Ok(Value::Bool(self.is_resolved(&args[0]))),
            ("fulfillment", 1) => self.fulfillment(&args[0]),
            ("whenResolved", 2) => Ok(self.when_resolved(vat, &args[0], args[1].clone())),
            ("whenBroken", 2) => Ok(self.when_broken(vat, &args[0], args[1].clone())),
            ("state", 1) => Ok(Value::from(self.state(&args[0]).as_str())),
            ("isNear", 1) => Ok(Value::Bool(self.is_near(&args[0]))),
            ("isEventual", 1) => Ok(Value::Bool(self.is_eventual(&args[0]))),
            ("isBroken", 1) => Ok(Value::Bool(self.is_broken(&args[0]))),
            ("optProblem", 1) => Ok(self.opt_problem(&args[0]).unwrap_or_default()),
            ("broken", 1) => Ok(self.broken(args[0].clone())),
            _ => Err(RefError::no_such_method(selector)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector;

    #[test]
    fn test_fulfillment_states() {
        let vat = Vat::default();
        let refs = RefFacade;
        let (p, r) = refs.promise();
        let value = Value::from(p);

        assert!(matches!(
            refs.fulfillment(&value),
            Err(RefError::NotYetResolved(ref v)) if v.same(&value)
        ));
        r.resolve_strict(&vat, Value::Int(42)).unwrap();
        assert_eq!(refs.fulfillment(&value).unwrap().as_int(), Some(42));
        assert_eq!(refs.fulfillment(&Value::from("plain")).unwrap().as_str(), Some("plain"));
    }

    #[test]
    fn test_broken_inspection() {
        let refs = RefFacade;
        let broken = refs.broken(Value::from("lost"));
        assert!(refs.is_broken(&broken));
        assert!(refs.is_resolved(&broken));
        assert_eq!(refs.opt_problem(&broken).unwrap().as_str(), Some("lost"));
        assert!(refs.opt_problem(&Value::Int(1)).is_none());
        assert!(matches!(
            refs.fulfillment(&broken),
            Err(RefError::Problem(ref p)) if p.as_str() == Some("lost")
        ));
    }

    #[test]
    fn test_message_interface() {
        let vat = Vat::default();
        let refs = RefFacade.to_value();

        let pair = vat.call(&refs, &Selector::new("promise", 0), &[]).unwrap();
        let promise = vat.call(&pair, &selector::GET, &[Value::Int(0)]).unwrap();
        let resolver = vat.call(&pair, &selector::GET, &[Value::Int(1)]).unwrap();

        let state = vat.call(&refs, &Selector::new("state", 1), &[promise.clone()]).unwrap();
        assert_eq!(state.as_str(), Some("EVENTUAL"));

        vat.call(&resolver, &selector::RESOLVE, &[Value::from("done")]).unwrap();
        let resolved = vat
            .call(&refs, &Selector::new("isResolved", 1), &[promise.clone()])
            .unwrap();
        assert_eq!(resolved.as_bool(), Some(true));
        let value = vat
            .call(&refs, &Selector::new("fulfillment", 1), &[promise])
            .unwrap();
        assert_eq!(value.as_str(), Some("done"));
        assert_eq!(refs.to_string(), "<Ref>");
    }
}
