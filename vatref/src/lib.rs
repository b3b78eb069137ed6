//! # vatref
//!
//! Promise resolution for a single-vat object-capability runtime.
//!
//! An eventual reference (a [`Promise`]) stands for a value that is not known
//! yet. Eventual sends to it are buffered; synchronous calls fail. Its
//! [`Resolver`] settles it exactly once, to a value, to another reference, or
//! to a [`Broken`] reference carrying a problem. Settlement replays the
//! buffered sends in order, flattens forwarding chains, and detects chains
//! that loop back to the promise itself. [`Reactor`]s watch a reference and
//! fire a callback at most once when it settles.
//!
//! ## Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  facade   RefFacade: promise, isResolved, fulfillment,      │
//! │           whenResolved, whenBroken, state, optProblem       │
//! ├──────────────────────────┬──────────────────────────────────┤
//! │  reactor                 │  settle                          │
//! │  • WhenResolved          │  • oneshot bridge to futures     │
//! │  • WhenBroken            │                                  │
//! ├──────────────────────────┴──────────────────────────────────┤
//! │  reference   Promise (switchable), Resolver, Broken,        │
//! │              buffered messages, path shortening             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  vat   FIFO turn queue: send_only, send_with_reply, call    │
//! │  value Value, Script, NativeFn, TextWriter   selector       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vatref::prelude::*;
//!
//! let vat = Vat::default();
//! let refs = RefFacade;
//! let (account, resolver) = refs.promise();
//!
//! // Buffered: the account is not known yet
//! let receipt = vat.send(account.clone().into(), Selector::new("deposit", 1), vec![Value::Int(100)]);
//!
//! resolver.resolve_strict(&vat, real_account)?;
//! vat.run_until_idle();
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod facade;
pub mod prelude;
pub mod reactor;
pub mod reference;
pub mod selector;
pub mod settle;
pub mod value;
pub mod vat;

pub use config::{VatConfig, VatConfigBuilder};
pub use error::{ConfigError, RefError};
pub use facade::RefFacade;
pub use reactor::{Reactor, ReactorKind};
pub use reference::{Broken, Promise, ResolutionState, Resolver};
pub use selector::Selector;
pub use settle::settled;
pub use value::{NativeFn, Script, TextWriter, Value};
pub use vat::{Vat, WeakVat};
