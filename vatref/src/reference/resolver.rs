//! The one-shot settlement capability.

use super::promise::{Promise, PromiseCell};
use super::Broken;
use crate::error::RefError;
use crate::selector::{self, Selector};
use crate::value::Value;
use crate::vat::Vat;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Capability to settle exactly one promise.
///
/// Holds a non-owning back-reference to its promise. After the first
/// settlement the binding is cleared, so later strict attempts fail with
/// [`RefError::AlreadyResolved`] and non-strict ones return `false`.
///
/// # Settlement
///
/// 1. **set_target**: follow the new target one hop, reject a target that is
///    the promise itself, store it, replay buffered sends against it
/// 2. **commit**: leave the switchable state and flatten the chain; a chain
///    that loops back settles the promise to a broken reference
/// 3. the resolver is spent
///
/// A direct self-target is rejected in step 1 without spending the resolver.
#[derive(Clone)]
pub struct Resolver {
    bound: Rc<RefCell<Option<Weak<PromiseCell>>>>,
}

impl Resolver {
    pub(crate) fn bound_to(promise: &Promise) -> Self {
        Self {
            bound: Rc::new(RefCell::new(Some(promise.downgrade()))),
        }
    }

    /// True when both handles name the same resolver.
    pub fn ptr_eq(&self, other: &Resolver) -> bool {
        Rc::ptr_eq(&self.bound, &other.bound)
    }

    /// True once this resolver has settled its promise.
    pub fn is_done(&self) -> bool {
        self.bound.borrow().is_none()
    }

    fn spend(&self) {
        self.bound.borrow_mut().take();
    }

    /// Settle the bound promise to `target`.
    ///
    /// Returns `Ok(true)` on settlement and `Ok(false)` for a non-strict call
    /// on a spent resolver.
    ///
    /// # Errors
    ///
    /// - [`RefError::AlreadyResolved`]: strict call on a spent resolver
    /// - [`RefError::RefLoop`]: the target chain leads back to the promise
    /// - [`RefError::NoLongerSwitchable`]: the promise left the switchable
    ///   state by other means
    pub fn resolve(&self, vat: &Vat, target: Value, strict: bool) -> Result<bool, RefError> {
        let bound = self.bound.borrow().clone();
        let Some(weak) = bound else {
            return if strict {
                Err(RefError::AlreadyResolved)
            } else {
                Ok(false)
            };
        };

        let Some(promise) = Promise::upgrade(&weak) else {
            // Nobody can observe the promise any more.
            tracing::trace!("Resolver settled a dropped promise");
            self.spend();
            return Ok(true);
        };

        promise.set_target(vat, target)?;
        let committed = promise.commit();
        self.spend();
        let target = committed?;
        tracing::debug!("Promise resolved to {}", target);
        Ok(true)
    }

    /// Strict settlement, discarding the boolean.
    pub fn resolve_strict(&self, vat: &Vat, target: Value) -> Result<(), RefError> {
        self.resolve(vat, target, true).map(|_| ())
    }

    /// Settle the bound promise to a fresh broken reference.
    pub fn smash(&self, vat: &Vat, problem: Value) -> Result<(), RefError> {
        self.resolve_strict(vat, Value::Broken(Broken::new(problem)))
    }

    /// Answer a call sent to this resolver.
    pub fn dispatch(&self, vat: &Vat, selector: &Selector, args: &[Value]) -> Result<Value, RefError> {
        if selector.same_method(&selector::RESOLVE) {
            self.resolve_strict(vat, args[0].clone())?;
            Ok(Value::Null)
        } else if selector.same_method(&selector::RESOLVE_STRICT) {
            let strict = args[1].as_bool().ok_or_else(|| {
                RefError::Problem(Value::from("resolve/2 expects a boolean strict flag"))
            })?;
            self.resolve(vat, args[0].clone(), strict).map(Value::Bool)
        } else if selector.same_method(&selector::SMASH) {
            self.smash(vat, args[0].clone())?;
            Ok(Value::Null)
        } else if selector.is("isDone", 0) {
            Ok(Value::Bool(self.is_done()))
        } else if selector.same_method(&selector::PRINT_ON) {
            vat.call(&args[0], &selector::PRINT, &[Value::from("<Resolver>")])?;
            Ok(Value::Null)
        } else {
            Err(RefError::no_such_method(selector))
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("done", &self.is_done())
            .finish()
    }
}
