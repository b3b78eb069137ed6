//! The switchable reference.

use super::broken::{Broken, FORWARDING_LOOP};
use super::buffer::{BufferedMessage, MessageQueue};
use super::{chain_target, resolve_fully, ResolutionState, Resolver};
use crate::error::RefError;
use crate::selector::{self, Selector};
use crate::value::Value;
use crate::vat::Vat;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Settlement progress of a promise.
enum Resolution {
    /// Switchable, no target yet. Eventual sends are buffered.
    Unresolved,
    /// Switchable, target stored, buffered messages being replayed.
    Targeted(Value),
    /// No longer switchable; the chain is being flattened.
    Committing,
    /// Settled. The target is final up to lazy path shortening.
    Resolved(Value),
}

pub(crate) struct PromiseCell {
    resolution: RefCell<Resolution>,
    pending: RefCell<MessageQueue>,
}

impl Resolution {
    fn take_target(&mut self) -> Option<Value> {
        match std::mem::replace(self, Resolution::Unresolved) {
            Resolution::Targeted(target) | Resolution::Resolved(target) => Some(target),
            Resolution::Unresolved | Resolution::Committing => None,
        }
    }
}

// Forwarding chains can be arbitrarily long before shortening touches them;
// unlink them iteratively so dropping the head does not recurse per hop.
impl Drop for PromiseCell {
    fn drop(&mut self) {
        let mut next = self.resolution.get_mut().take_target();
        while let Some(Value::Promise(promise)) = next {
            next = match Rc::try_unwrap(promise.cell) {
                Ok(mut cell) => cell.resolution.get_mut().take_target(),
                Err(_shared) => None,
            };
        }
    }
}

/// Outcome of following one forwarding hop.
pub(crate) enum Hop {
    /// Still switchable: the promise stands for itself.
    Stay,
    /// Settled to this target.
    Next(Value),
    /// Reached a promise that is being committed, i.e. a forwarding loop.
    Loop,
}

/// A switchable reference.
///
/// A promise starts unresolved. While unresolved, eventual sends are
/// buffered in arrival order and answered with a placeholder promise;
/// synchronous calls fail with [`RefError::NotSynchronouslyCallable`]. Once
/// its [`Resolver`] settles it, the buffered sends are replayed against the
/// target and every later call is forwarded there.
///
/// # Lifecycle
///
/// 1. **Created**: with its resolver, via [`Promise::pair`]
/// 2. **Buffering**: eventual sends queue up
/// 3. **Settled**: the resolver stores a target; the queue drains once and
///    stays empty
/// 4. **Forwarding**: calls go to the target; chains through other settled
///    promises shorten by one hop per use
///
/// Cloning shares the same cell.
#[derive(Clone)]
pub struct Promise {
    cell: Rc<PromiseCell>,
}

impl Promise {
    /// Allocate an unresolved promise and the resolver bound to it.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let (promise, resolver) = Promise::pair();
    /// resolver.resolve_strict(&vat, Value::Int(42))?;
    /// assert_eq!(promise.state(), ResolutionState::Near);
    /// ```
    pub fn pair() -> (Promise, Resolver) {
        let promise = Promise {
            cell: Rc::new(PromiseCell {
                resolution: RefCell::new(Resolution::Unresolved),
                pending: RefCell::new(MessageQueue::default()),
            }),
        };
        let resolver = Resolver::bound_to(&promise);
        (promise, resolver)
    }

    pub(crate) fn downgrade(&self) -> Weak<PromiseCell> {
        Rc::downgrade(&self.cell)
    }

    pub(crate) fn upgrade(weak: &Weak<PromiseCell>) -> Option<Promise> {
        weak.upgrade().map(|cell| Promise { cell })
    }

    /// True when both handles name the same promise.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    /// True until the resolver commits a target.
    pub fn is_switchable(&self) -> bool {
        matches!(
            *self.cell.resolution.borrow(),
            Resolution::Unresolved | Resolution::Targeted(_)
        )
    }

    /// Number of buffered eventual sends.
    pub fn pending_len(&self) -> usize {
        self.cell.pending.borrow().len()
    }

    /// The stored target, once settled.
    pub fn target(&self) -> Option<Value> {
        match &*self.cell.resolution.borrow() {
            Resolution::Resolved(target) => Some(target.clone()),
            _ => None,
        }
    }

    pub(crate) fn hop(&self) -> Hop {
        match &*self.cell.resolution.borrow() {
            Resolution::Unresolved | Resolution::Targeted(_) => Hop::Stay,
            Resolution::Committing => Hop::Loop,
            Resolution::Resolved(target) => Hop::Next(target.clone()),
        }
    }

    /// Replace a target that is itself a settled promise with that
    /// promise's target.
    fn shorten(&self) {
        let next = match &*self.cell.resolution.borrow() {
            Resolution::Resolved(Value::Promise(inner)) => match inner.target() {
                Some(next) => next,
                None => return,
            },
            _ => return,
        };
        *self.cell.resolution.borrow_mut() = Resolution::Resolved(next);
    }

    /// Whether this promise, and everything it forwards to, is settled.
    pub fn is_resolved(&self) -> bool {
        self.state() != ResolutionState::Eventual
    }

    /// Walk the target chain to classify this promise.
    pub fn state(&self) -> ResolutionState {
        let mut current = self.clone();
        loop {
            if current.is_switchable() {
                return ResolutionState::Eventual;
            }
            current.shorten();
            match current.target() {
                Some(Value::Promise(next)) => current = next,
                Some(Value::Broken(_)) => return ResolutionState::Broken,
                Some(_) => return ResolutionState::Near,
                // Committing stands in for the forwarding-loop broken reference.
                None => return ResolutionState::Broken,
            }
        }
    }

    /// Answer a call sent to this promise.
    pub fn dispatch(&self, vat: &Vat, selector: &Selector, args: &[Value]) -> Result<Value, RefError> {
        if self.is_switchable() {
            if selector.same_method(&selector::PRINT_ON) {
                vat.call(&args[0], &selector::PRINT, &[Value::from("<Promise>")])?;
                return Ok(Value::Null);
            }
            if selector.is_eventual() {
                return Ok(self.buffer(vat, selector, args));
            }
            return Err(RefError::NotSynchronouslyCallable {
                verb: selector.verb().to_string(),
                arity: selector.arity(),
            });
        }

        self.shorten();
        match self.target() {
            Some(target) => target.dispatch(vat, selector, args),
            None => Err(RefError::CantHappen(
                "dispatch reached a promise mid-commit".to_string(),
            )),
        }
    }

    fn buffer(&self, vat: &Vat, selector: &Selector, args: &[Value]) -> Value {
        let (placeholder, resolver) = Promise::pair();
        let mut pending = self.cell.pending.borrow_mut();
        pending.push(BufferedMessage::new(
            selector.clone(),
            args.to_vec(),
            vat.downgrade(),
            resolver,
        ));
        tracing::trace!(selector = %selector, pending = pending.len(), "buffered send on unresolved promise");
        Value::Promise(placeholder)
    }

    /// Store the target and replay buffered sends against it.
    pub(crate) fn set_target(&self, vat: &Vat, target: Value) -> Result<(), RefError> {
        if !matches!(*self.cell.resolution.borrow(), Resolution::Unresolved) {
            return Err(RefError::NoLongerSwitchable);
        }

        let target = chain_target(&target);
        if let Value::Promise(promise) = &target {
            if promise.ptr_eq(self) {
                tracing::debug!("Promise resolution rejected: target is the promise itself");
                return Err(RefError::RefLoop);
            }
        }

        *self.cell.resolution.borrow_mut() = Resolution::Targeted(target.clone());
        let pending = self.cell.pending.borrow_mut().take();
        if !pending.is_empty() {
            tracing::debug!("Replaying {} buffered sends", pending.len());
        }
        for message in pending {
            message.replay(vat, &target);
        }
        Ok(())
    }

    /// Leave the switchable state and flatten the forwarding chain.
    ///
    /// While flattening, this promise is marked `Committing`, so a chain that
    /// leads back here stops at the marker instead of cycling. A real loop
    /// leaves the promise settled to a broken reference.
    pub(crate) fn commit(&self) -> Result<Value, RefError> {
        let first = match &*self.cell.resolution.borrow() {
            Resolution::Targeted(target) => target.clone(),
            _ => {
                return Err(RefError::CantHappen(
                    "commit without a stored target".to_string(),
                ))
            }
        };
        *self.cell.resolution.borrow_mut() = Resolution::Committing;

        match flatten(first) {
            Some(target) => {
                *self.cell.resolution.borrow_mut() = Resolution::Resolved(target.clone());
                Ok(target)
            }
            None => {
                tracing::debug!("Promise resolution caught in a forwarding loop");
                *self.cell.resolution.borrow_mut() =
                    Resolution::Resolved(Value::Broken(Broken::new(Value::from(FORWARDING_LOOP))));
                Err(RefError::RefLoop)
            }
        }
    }
}

/// Follow hops to the end of the chain; `None` if the chain loops back to a
/// promise that is committing.
fn flatten(mut current: Value) -> Option<Value> {
    loop {
        let hop = match &current {
            Value::Promise(promise) => promise.hop(),
            _ => Hop::Stay,
        };
        match hop {
            Hop::Stay => return Some(current),
            Hop::Next(next) => current = next,
            Hop::Loop => return None,
        }
    }
}

impl fmt::Display for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match resolve_fully(&Value::Promise(self.clone())) {
            Value::Promise(_) => f.write_str("<Promise>"),
            settled => write!(f, "{}", settled),
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("state", &self.state())
            .field("pending", &self.pending_len())
            .finish()
    }
}
