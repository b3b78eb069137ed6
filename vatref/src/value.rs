//! Runtime values and the generic dispatch layer.
//!
//! [`Value`] is a tagged variant over every shape the reference core deals
//! with: plain data, the reference kinds (promise, broken reference), the
//! capabilities built around them (resolver, reactor), and ordinary objects
//! implementing [`Script`]. Dispatch matches exhaustively on the variant.
//!
//! Every value that is not itself a reference is already settled, so it
//! answers the two reactor-attachment verbs (`whenMoreResolved/1`,
//! `whenBroken/1`) by sending `run/1` back to the reactor with itself as the
//! argument.

use crate::error::RefError;
use crate::reactor::Reactor;
use crate::reference::{Broken, Promise, Resolver};
use crate::selector::{self, Selector};
use crate::vat::Vat;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Behaviour of an ordinary callable object.
///
/// Implementors answer selectors for the current vat turn. The reactor
/// attachment verbs never reach a script; they are handled by
/// [`Value::dispatch`] before the script is consulted.
pub trait Script {
    /// Short name used when the object prints itself.
    fn name(&self) -> &str {
        "Object"
    }

    /// Answer a call.
    fn dispatch(&self, vat: &Vat, selector: &Selector, args: &[Value]) -> Result<Value, RefError>;
}

/// A value flowing through the runtime.
#[derive(Clone, Default)]
pub enum Value {
    /// The null value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A fixnum.
    Int(i64),
    /// An immutable string.
    Str(Rc<str>),
    /// An immutable list.
    List(Rc<[Value]>),
    /// A switchable reference (promise).
    Promise(Promise),
    /// A broken reference carrying a problem.
    Broken(Broken),
    /// The settlement capability of a promise.
    Resolver(Resolver),
    /// A when-resolved or when-broken reactor.
    Reactor(Reactor),
    /// An ordinary object.
    Object(Rc<dyn Script>),
}

impl Value {
    /// Wrap a closure as a callable object answering `run/N`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let double = Value::function(|_vat, args| match &args[0] {
    ///     Value::Int(n) => Ok(Value::Int(n * 2)),
    ///     _ => Ok(Value::Null),
    /// });
    /// ```
    pub fn function<F>(body: F) -> Value
    where
        F: Fn(&Vat, &[Value]) -> Result<Value, RefError> + 'static,
    {
        Value::Object(Rc::new(NativeFn::new(body)))
    }

    /// A fresh broken reference carrying `problem`.
    pub fn broken(problem: impl Into<Value>) -> Value {
        Value::Broken(Broken::new(problem.into()))
    }

    /// Build a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    /// True for switchable references.
    pub fn is_reference(&self) -> bool {
        matches!(self, Value::Promise(_))
    }

    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Fixnum payload, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The promise, if this is one.
    pub fn as_promise(&self) -> Option<&Promise> {
        match self {
            Value::Promise(p) => Some(p),
            _ => None,
        }
    }

    /// The resolver, if this is one.
    pub fn as_resolver(&self) -> Option<&Resolver> {
        match self {
            Value::Resolver(r) => Some(r),
            _ => None,
        }
    }

    /// Sameness: data compares by value, everything else by identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.same(y))
            }
            (Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
            (Value::Broken(a), Value::Broken(b)) => a.ptr_eq(b),
            (Value::Resolver(a), Value::Resolver(b)) => a.ptr_eq(b),
            (Value::Reactor(a), Value::Reactor(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Deliver a call to this value within the current turn.
    ///
    /// Fails with [`RefError::NoSuchMethod`] when the argument count does not
    /// match the selector's arity, so receivers can index `args` freely.
    pub fn dispatch(&self, vat: &Vat, selector: &Selector, args: &[Value]) -> Result<Value, RefError> {
        if args.len() != selector.arity() {
            return Err(RefError::no_such_method(selector));
        }
        match self {
            Value::Promise(promise) => promise.dispatch(vat, selector, args),
            Value::Broken(broken) => broken.dispatch(vat, selector, args),
            _ => {
                if let Some(settled) = self.attach_reactor(vat, selector, args) {
                    return Ok(settled);
                }
                match self {
                    Value::Resolver(resolver) => resolver.dispatch(vat, selector, args),
                    Value::Reactor(reactor) => reactor.dispatch(vat, selector, args),
                    Value::Object(script) => script.dispatch(vat, selector, args),
                    _ => self.dispatch_data(vat, selector, args),
                }
            }
        }
    }

    // A near value is already settled: reply to the reactor right away.
    fn attach_reactor(&self, vat: &Vat, selector: &Selector, args: &[Value]) -> Option<Value> {
        if selector.same_method(&selector::WHEN_MORE_RESOLVED)
            || selector.same_method(&selector::WHEN_BROKEN)
        {
            vat.send_only(args[0].clone(), selector::RUN, vec![self.clone()]);
            Some(Value::Null)
        } else {
            None
        }
    }

    fn dispatch_data(&self, vat: &Vat, selector: &Selector, args: &[Value]) -> Result<Value, RefError> {
        if selector.same_method(&selector::PRINT_ON) {
            vat.call(&args[0], &selector::PRINT, &[Value::from(self.to_string())])?;
            return Ok(Value::Null);
        }
        if let Value::List(items) = self {
            if selector.same_method(&selector::GET) {
                let index = args[0]
                    .as_int()
                    .and_then(|i| usize::try_from(i).ok())
                    .ok_or_else(|| RefError::Problem(Value::from("list index must be a fixnum")))?;
                return items.get(index).cloned().ok_or_else(|| {
                    RefError::Problem(Value::from(format!(
                        "index {} out of bounds for list of size {}",
                        index,
                        items.len()
                    )))
                });
            }
            if selector.is("size", 0) {
                return Ok(Value::Int(items.len() as i64));
            }
        }
        Err(RefError::no_such_method(selector))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Rc::from(items))
    }
}

impl From<Promise> for Value {
    fn from(p: Promise) -> Self {
        Value::Promise(p)
    }
}

impl From<Resolver> for Value {
    fn from(r: Resolver) -> Self {
        Value::Resolver(r)
    }
}

impl From<Broken> for Value {
    fn from(b: Broken) -> Self {
        Value::Broken(b)
    }
}

impl From<Reactor> for Value {
    fn from(r: Reactor) -> Self {
        Value::Reactor(r)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Promise(p) => write!(f, "{}", p),
            Value::Broken(b) => write!(f, "{}", b),
            Value::Resolver(_) => f.write_str("<Resolver>"),
            Value::Reactor(r) => write!(f, "<{}>", r.kind()),
            Value::Object(script) => write!(f, "<{}>", script.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            other => write!(f, "{}", other),
        }
    }
}

/// A callable object backed by a Rust closure.
///
/// Answers `run/N` for any arity by passing the arguments to the closure.
pub struct NativeFn {
    name: Cow<'static, str>,
    body: Box<dyn Fn(&Vat, &[Value]) -> Result<Value, RefError>>,
}

impl NativeFn {
    /// Wrap a closure.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&Vat, &[Value]) -> Result<Value, RefError> + 'static,
    {
        Self {
            name: Cow::Borrowed("function"),
            body: Box::new(body),
        }
    }

    /// Set the printed name.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }
}

impl Script for NativeFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(&self, vat: &Vat, selector: &Selector, args: &[Value]) -> Result<Value, RefError> {
        if selector.verb() == "run" {
            (self.body)(vat, args)
        } else {
            Err(RefError::no_such_method(selector))
        }
    }
}

/// A text sink answering `print/1` and `println/1`.
///
/// This is the sink `__printOn/1` writes into.
#[derive(Debug, Default)]
pub struct TextWriter {
    buffer: RefCell<String>,
}

impl TextWriter {
    /// Create an empty writer.
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Everything printed so far.
    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }

    /// Share this writer as a callable value.
    pub fn to_value(self: &Rc<Self>) -> Value {
        Value::Object(self.clone())
    }
}

impl Script for TextWriter {
    fn name(&self) -> &str {
        "TextWriter"
    }

    fn dispatch(&self, _vat: &Vat, selector: &Selector, args: &[Value]) -> Result<Value, RefError> {
        if selector.same_method(&selector::PRINT) {
            self.buffer.borrow_mut().push_str(&args[0].to_string());
        } else if selector.is("println", 1) {
            let mut buffer = self.buffer.borrow_mut();
            buffer.push_str(&args[0].to_string());
            buffer.push('\n');
        } else {
            return Err(RefError::no_such_method(selector));
        }
        Ok(Value::Null)
    }
}
