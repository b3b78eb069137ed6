//! One-shot watchers fired when a reference settles.
//!
//! A reactor does not poll. It attaches itself to the watched reference with
//! a one-way send of an attachment verb; an unresolved promise buffers that
//! send like any other and replays it on settlement, and any settled value
//! answers it by sending `run/1` back. Each run either re-attaches (still
//! eventual) or fires and becomes inert.
//!
//! ```text
//!   arm ──▶ watched <- whenMoreResolved(reactor)
//!                │ (buffered while eventual)
//!                ▼
//!   reactor <- run(value) ──▶ still eventual? ──yes──▶ arm again
//!                                   │ no
//!                                   ▼
//!                     callback(watched) ─▶ resolve outcome ─▶ Fired
//! ```

use crate::error::RefError;
use crate::reference::{self, ResolutionState, Resolver};
use crate::selector::{self, Selector};
use crate::value::Value;
use crate::vat::Vat;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Which settlement a reactor waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactorKind {
    /// Fires on any settlement.
    WhenResolved,
    /// Fires only when the watched reference breaks.
    WhenBroken,
}

impl ReactorKind {
    /// Attachment verb used when arming.
    fn attachment(&self) -> Selector {
        match self {
            ReactorKind::WhenResolved => selector::WHEN_MORE_RESOLVED,
            ReactorKind::WhenBroken => selector::WHEN_BROKEN,
        }
    }
}

impl fmt::Display for ReactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReactorKind::WhenResolved => f.write_str("whenResolvedReactor"),
            ReactorKind::WhenBroken => f.write_str("whenBrokenReactor"),
        }
    }
}

enum ReactorState {
    Armed {
        callback: Value,
        watched: Value,
        resolver: Option<Resolver>,
    },
    Fired,
}

struct ReactorCell {
    kind: ReactorKind,
    state: RefCell<ReactorState>,
}

/// A watcher that runs its callback at most once.
///
/// Callback, watched reference and outcome resolver are released the moment
/// the reactor fires.
#[derive(Clone)]
pub struct Reactor {
    inner: Rc<ReactorCell>,
}

impl Reactor {
    fn new(kind: ReactorKind, callback: Value, watched: Value, resolver: Option<Resolver>) -> Self {
        Self {
            inner: Rc::new(ReactorCell {
                kind,
                state: RefCell::new(ReactorState::Armed {
                    callback,
                    watched,
                    resolver,
                }),
            }),
        }
    }

    /// A reactor that calls `callback` once `watched` settles.
    pub fn when_resolved(callback: Value, watched: Value, resolver: Option<Resolver>) -> Self {
        Self::new(ReactorKind::WhenResolved, callback, watched, resolver)
    }

    /// A reactor that calls `callback` if `watched` breaks.
    pub fn when_broken(callback: Value, watched: Value, resolver: Option<Resolver>) -> Self {
        Self::new(ReactorKind::WhenBroken, callback, watched, resolver)
    }

    /// What this reactor waits for.
    pub fn kind(&self) -> ReactorKind {
        self.inner.kind
    }

    /// True once the reactor has fired.
    pub fn is_fired(&self) -> bool {
        matches!(*self.inner.state.borrow(), ReactorState::Fired)
    }

    /// True when both handles name the same reactor.
    pub fn ptr_eq(&self, other: &Reactor) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Attach to the watched reference with a one-way send.
    pub fn arm(&self, vat: &Vat) {
        let watched = match &*self.inner.state.borrow() {
            ReactorState::Armed { watched, .. } => watched.clone(),
            ReactorState::Fired => return,
        };
        vat.send_only(
            watched,
            self.inner.kind.attachment(),
            vec![Value::Reactor(self.clone())],
        );
    }

    /// Check the watched reference and fire, retire or re-arm.
    pub fn run(&self, vat: &Vat) {
        let watched = match &*self.inner.state.borrow() {
            ReactorState::Armed { watched, .. } => watched.clone(),
            ReactorState::Fired => return,
        };

        match self.inner.kind {
            ReactorKind::WhenResolved => {
                if reference::is_resolved(&watched) {
                    self.fire(vat);
                } else {
                    self.arm(vat);
                }
            }
            ReactorKind::WhenBroken => match reference::state_of(&watched) {
                ResolutionState::Broken => self.fire(vat),
                ResolutionState::Near => self.retire(vat),
                ResolutionState::Eventual => self.arm(vat),
            },
        }
    }

    // Taking the state first makes a re-entrant run a no-op.
    fn take(&self) -> Option<(Value, Value, Option<Resolver>)> {
        match std::mem::replace(&mut *self.inner.state.borrow_mut(), ReactorState::Fired) {
            ReactorState::Armed {
                callback,
                watched,
                resolver,
            } => Some((callback, watched, resolver)),
            ReactorState::Fired => None,
        }
    }

    fn fire(&self, vat: &Vat) {
        let Some((callback, watched, resolver)) = self.take() else {
            return;
        };
        tracing::debug!("{} firing", self.inner.kind);

        let outcome = vat
            .call(&callback, &selector::RUN, &[watched])
            .unwrap_or_else(|err| Value::broken(err.into_problem()));
        if let Some(resolver) = resolver {
            settle(vat, &resolver, outcome);
        }
    }

    fn retire(&self, vat: &Vat) {
        let Some((_callback, _watched, resolver)) = self.take() else {
            return;
        };
        tracing::debug!("{} retired: watched reference resolved near", self.inner.kind);
        if let Some(resolver) = resolver {
            settle(vat, &resolver, Value::Null);
        }
    }

    /// Answer a call sent to this reactor.
    pub fn dispatch(&self, vat: &Vat, selector: &Selector, args: &[Value]) -> Result<Value, RefError> {
        if selector.same_method(&selector::RUN) {
            self.run(vat);
            Ok(Value::Null)
        } else if selector.same_method(&selector::PRINT_ON) {
            vat.call(&args[0], &selector::PRINT, &[Value::from(format!("<{}>", self.kind()))])?;
            Ok(Value::Null)
        } else {
            Err(RefError::no_such_method(selector))
        }
    }
}

fn settle(vat: &Vat, resolver: &Resolver, outcome: Value) {
    if let Err(err) = resolver.resolve(vat, outcome, false) {
        tracing::warn!("Reactor outcome not settled: {}", err);
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor")
            .field("kind", &self.kind())
            .field("fired", &self.is_fired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::Promise;
    use std::cell::Cell;

    fn counting_callback() -> (Value, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let callback = Value::function(move |_vat, _args| {
            counter.set(counter.get() + 1);
            Ok(Value::from("fired"))
        });
        (callback, calls)
    }

    #[test]
    fn test_run_after_fire_is_noop() {
        let vat = Vat::default();
        let (callback, calls) = counting_callback();
        let reactor = Reactor::when_resolved(callback, Value::Int(1), None);

        reactor.run(&vat);
        reactor.run(&vat);
        assert_eq!(calls.get(), 1);
        assert!(reactor.is_fired());
        assert!(vat.is_idle());
    }

    #[test]
    fn test_unresolved_watch_rearms() {
        let vat = Vat::default();
        let (p, r) = Promise::pair();
        let (callback, calls) = counting_callback();
        let reactor = Reactor::when_resolved(callback, p.clone().into(), None);

        reactor.run(&vat);
        assert_eq!(vat.pending_turns(), 1);
        vat.run_until_idle();
        assert_eq!(p.pending_len(), 1);
        assert_eq!(calls.get(), 0);

        r.resolve_strict(&vat, Value::Int(3)).unwrap();
        vat.run_until_idle();
        assert_eq!(calls.get(), 1);
        assert!(reactor.is_fired());
    }

    #[test]
    fn test_when_broken_retires_on_near() {
        let vat = Vat::default();
        let (outcome, resolver) = Promise::pair();
        let (callback, calls) = counting_callback();
        let reactor = Reactor::when_broken(callback, Value::Int(1), Some(resolver));

        reactor.run(&vat);
        assert_eq!(calls.get(), 0);
        assert!(reactor.is_fired());
        assert!(outcome.target().is_some_and(|v| v.is_null()));
    }

    #[test]
    fn test_failing_callback_breaks_outcome() {
        let vat = Vat::default();
        let (outcome, resolver) = Promise::pair();
        let callback = Value::function(|_vat, _args| Err(RefError::Problem(Value::from("bad"))));
        let reactor = Reactor::when_resolved(callback, Value::Int(1), Some(resolver));

        reactor.run(&vat);
        match outcome.target() {
            Some(Value::Broken(b)) => assert_eq!(b.problem().as_str(), Some("bad")),
            other => panic!("expected broken outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_run() {
        let vat = Vat::default();
        let (callback, calls) = counting_callback();
        let reactor = Value::from(Reactor::when_resolved(callback, Value::Null, None));
        vat.send_only(reactor.clone(), selector::RUN, vec![Value::Null]);
        vat.run_until_idle();
        assert_eq!(calls.get(), 1);
        assert_eq!(reactor.to_string(), "<whenResolvedReactor>");
    }
}
