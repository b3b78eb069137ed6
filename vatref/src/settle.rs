//! Bridge from reference settlement to Rust futures.
//!
//! # Example
//!
//! ```rust,ignore
//! let outcome = settled(&vat, &promise.clone().into());
//! resolver.resolve_strict(&vat, Value::Int(5))?;
//! vat.run_until_idle();
//! assert_eq!(outcome.await?.as_int(), Some(5));
//! ```

use crate::error::RefError;
use crate::facade::RefFacade;
use crate::reactor::Reactor;
use crate::value::Value;
use crate::vat::Vat;
use std::cell::RefCell;
use std::future::Future;
use tokio::sync::oneshot;

/// Resolve once `value` settles.
///
/// Arms a when-resolved reactor whose callback forwards the settled value
/// through a oneshot channel. The future only makes progress while the vat is
/// driven; it stays pending for as long as `value` remains eventual.
///
/// # Errors
///
/// - [`RefError::Problem`] when `value` breaks
/// - [`RefError::Abandoned`] when the reactor is dropped unfired, e.g. with
///   its vat
pub fn settled(vat: &Vat, value: &Value) -> impl Future<Output = Result<Value, RefError>> {
    let (tx, rx) = oneshot::channel::<Value>();
    let sender = RefCell::new(Some(tx));
    let callback = Value::function(move |_vat, args| {
        if let Some(tx) = sender.borrow_mut().take() {
            // Receiver dropped: nobody is waiting any more.
            let _ = tx.send(args[0].clone());
        }
        Ok(Value::Null)
    });
    Reactor::when_resolved(callback, value.clone(), None).arm(vat);

    async move {
        let settled = rx.await.map_err(|_| RefError::Abandoned)?;
        RefFacade.fulfillment(&settled)
    }
}
