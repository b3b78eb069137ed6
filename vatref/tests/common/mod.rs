//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use vatref::prelude::*;

/// Install a fmt subscriber honouring `RUST_LOG`; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A callable that records every argument list it is run with.
pub fn recorder() -> (Value, Rc<RefCell<Vec<Vec<Value>>>>) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = calls.clone();
    let callable = Value::function(move |_vat, args| {
        sink.borrow_mut().push(args.to_vec());
        Ok(Value::from(format!("call #{}", sink.borrow().len())))
    });
    (callable, calls)
}

/// An object answering `deposit/1` by accumulating into a balance.
pub struct Account {
    pub balance: RefCell<i64>,
    pub deposits: RefCell<Vec<i64>>,
}

impl Account {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            balance: RefCell::new(0),
            deposits: RefCell::new(Vec::new()),
        })
    }
}

impl Script for Account {
    fn name(&self) -> &str {
        "Account"
    }

    fn dispatch(&self, _vat: &Vat, selector: &Selector, args: &[Value]) -> Result<Value> {
        if selector.is("deposit", 1) {
            let amount = args[0].as_int().unwrap_or(0);
            self.deposits.borrow_mut().push(amount);
            *self.balance.borrow_mut() += amount;
            Ok(Value::Int(*self.balance.borrow()))
        } else if selector.is("balance", 0) {
            Ok(Value::Int(*self.balance.borrow()))
        } else {
            Err(RefError::NoSuchMethod {
                verb: selector.verb().to_string(),
                arity: selector.arity(),
            })
        }
    }
}
