//! Broken references.

use crate::error::RefError;
use crate::selector::{self, Selector};
use crate::value::Value;
use crate::vat::Vat;
use std::fmt;
use std::rc::Rc;

/// Problem carried by a promise whose resolution looped back to itself.
pub const FORWARDING_LOOP: &str = "Caught in a forwarding loop";

/// A terminal reference that fails every message with its problem.
///
/// Synchronous calls fail with [`RefError::Problem`]; eventual sends yield a
/// fresh broken reference carrying the same problem. Reactor attachment is
/// answered immediately, since a broken reference is already settled, and
/// `__printOn/1` prints `<ref broken by PROBLEM>`.
#[derive(Clone)]
pub struct Broken {
    problem: Rc<Value>,
}

impl Broken {
    /// Wrap a problem.
    pub fn new(problem: Value) -> Self {
        Self {
            problem: Rc::new(problem),
        }
    }

    /// The stored failure.
    pub fn problem(&self) -> &Value {
        &self.problem
    }

    /// True when both handles name the same broken reference.
    pub fn ptr_eq(&self, other: &Broken) -> bool {
        Rc::ptr_eq(&self.problem, &other.problem)
    }

    /// Answer a call sent to this broken reference.
    pub fn dispatch(&self, vat: &Vat, selector: &Selector, args: &[Value]) -> Result<Value, RefError> {
        if selector.same_method(&selector::WHEN_BROKEN)
            || selector.same_method(&selector::WHEN_MORE_RESOLVED)
        {
            vat.send_only(
                args[0].clone(),
                selector::RUN,
                vec![Value::Broken(self.clone())],
            );
            return Ok(Value::Broken(self.clone()));
        }
        if selector.same_method(&selector::PRINT_ON) {
            vat.call(&args[0], &selector::PRINT, &[Value::from(self.to_string())])?;
            return Ok(Value::Null);
        }
        if selector.is_eventual() {
            Ok(Value::Broken(Broken::new(self.problem().clone())))
        } else {
            Err(RefError::Problem(self.problem().clone()))
        }
    }
}

impl fmt::Display for Broken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ref broken by {}>", self.problem)
    }
}

impl fmt::Debug for Broken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Broken").field(&*self.problem).finish()
    }
}
