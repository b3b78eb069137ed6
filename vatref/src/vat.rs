//! Single-threaded turn queue.
//!
//! A vat owns a FIFO queue of pending turns. Each turn delivers one message
//! to one target; nothing runs concurrently with it, so the references a vat
//! owns are mutated without locking.
//!
//! # Architecture
//!
//! ```text
//! send_only / send_with_reply / send
//!          │
//!          ▼
//!   ┌─────────────┐   run_turn()    ┌──────────────────────────┐
//!   │ turn queue  │ ──────────────▶ │ target.dispatch(sel,args)│
//!   │ (FIFO)      │                 └────────────┬─────────────┘
//!   └─────────────┘                              │ outcome
//!          ▲                                     ▼
//!          │ new sends            reply resolver (if any) settles,
//!          └──────────────────── failures become broken references
//! ```

use crate::config::VatConfig;
use crate::error::RefError;
use crate::reference::{Promise, Resolver};
use crate::selector::Selector;
use crate::value::Value;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

/// One scheduled message delivery.
struct Turn {
    target: Value,
    selector: Selector,
    args: Vec<Value>,
    reply: Option<Resolver>,
}

struct VatInner {
    config: VatConfig,
    queue: RefCell<VecDeque<Turn>>,
    turns_run: Cell<u64>,
}

/// Handle to a scheduling context.
///
/// Cloning is cheap and yields a handle to the same queue.
///
/// # Example
///
/// ```rust,ignore
/// let vat = Vat::new(VatConfig::default());
/// let (promise, resolver) = Promise::pair();
///
/// // Buffered until the promise resolves
/// let reply = vat.send(promise.clone().into(), Selector::new("deposit", 1), vec![Value::Int(5)]);
///
/// resolver.resolve_strict(&vat, account)?;
/// vat.run_until_idle();
/// ```
#[derive(Clone)]
pub struct Vat {
    inner: Rc<VatInner>,
}

/// Non-owning handle to a vat.
#[derive(Clone)]
pub struct WeakVat {
    inner: Weak<VatInner>,
}

impl WeakVat {
    /// Recover the vat if it is still alive.
    pub fn upgrade(&self) -> Option<Vat> {
        self.inner.upgrade().map(|inner| Vat { inner })
    }
}

impl Default for Vat {
    fn default() -> Self {
        Self::new(VatConfig::default())
    }
}

impl Vat {
    /// Create a vat with an empty turn queue.
    pub fn new(config: VatConfig) -> Self {
        tracing::debug!("Vat created: {}", config.name);
        Self {
            inner: Rc::new(VatInner {
                config,
                queue: RefCell::new(VecDeque::new()),
                turns_run: Cell::new(0),
            }),
        }
    }

    /// The vat's configuration.
    pub fn config(&self) -> &VatConfig {
        &self.inner.config
    }

    /// The vat's name.
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// A non-owning handle to this vat.
    pub fn downgrade(&self) -> WeakVat {
        WeakVat {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// True when both handles name the same vat.
    pub fn ptr_eq(&self, other: &Vat) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Schedule a one-way send with no reply path.
    pub fn send_only(&self, target: Value, selector: Selector, args: Vec<Value>) {
        self.enqueue(Turn {
            target,
            selector: selector.as_eventual(),
            args,
            reply: None,
        });
    }

    /// Schedule a send whose outcome settles `reply`.
    pub fn send_with_reply(&self, target: Value, selector: Selector, args: Vec<Value>, reply: Resolver) {
        self.enqueue(Turn {
            target,
            selector: selector.as_eventual(),
            args,
            reply: Some(reply),
        });
    }

    /// Schedule a send and return a promise for its outcome.
    pub fn send(&self, target: Value, selector: Selector, args: Vec<Value>) -> Value {
        let (result, resolver) = Promise::pair();
        self.send_with_reply(target, selector, args, resolver);
        Value::Promise(result)
    }

    /// Perform a synchronous call within the current turn.
    pub fn call(&self, target: &Value, selector: &Selector, args: &[Value]) -> Result<Value, RefError> {
        target.dispatch(self, &selector.as_sync(), args)
    }

    /// Number of turns waiting in the queue.
    pub fn pending_turns(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// True when no turn is waiting.
    pub fn is_idle(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    /// Total turns executed since creation.
    pub fn turns_run(&self) -> u64 {
        self.inner.turns_run.get()
    }

    /// Execute the oldest pending turn.
    ///
    /// Returns `false` when the queue was empty.
    pub fn run_turn(&self) -> bool {
        // The queue borrow must end before delivery: turns enqueue more turns.
        let next = self.inner.queue.borrow_mut().pop_front();
        match next {
            Some(turn) => {
                self.deliver(turn);
                self.inner.turns_run.set(self.inner.turns_run.get() + 1);
                true
            }
            None => false,
        }
    }

    /// Run turns until the queue drains or the configured turn limit is hit.
    ///
    /// Returns the number of turns executed.
    pub fn run_until_idle(&self) -> usize {
        let limit = self.inner.config.turn_limit;
        let mut executed = 0;
        while executed < limit && self.run_turn() {
            executed += 1;
        }
        if !self.is_idle() {
            tracing::warn!(
                "Vat {} stopped after {} turns with {} still pending",
                self.name(),
                executed,
                self.pending_turns()
            );
        }
        executed
    }

    fn enqueue(&self, turn: Turn) {
        tracing::trace!(vat = %self.name(), selector = %turn.selector, "turn scheduled");
        self.inner.queue.borrow_mut().push_back(turn);
    }

    fn deliver(&self, turn: Turn) {
        let Turn {
            target,
            selector,
            args,
            reply,
        } = turn;
        tracing::trace!(vat = %self.name(), selector = %selector, "delivering turn");

        let outcome = target.dispatch(self, &selector, &args);
        match reply {
            Some(resolver) => {
                let value = outcome.unwrap_or_else(|err| Value::broken(err.into_problem()));
                if let Err(err) = resolver.resolve(self, value, false) {
                    tracing::warn!("Vat {}: reply to {} not settled: {}", self.name(), selector, err);
                }
            }
            None => {
                if let Err(err) = outcome {
                    tracing::warn!("Vat {}: one-way {} failed: {}", self.name(), selector, err);
                }
            }
        }
    }
}

impl fmt::Debug for Vat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vat")
            .field("name", &self.name())
            .field("pending_turns", &self.pending_turns())
            .field("turns_run", &self.turns_run())
            .finish()
    }
}
