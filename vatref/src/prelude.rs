//! Common imports for working with eventual references.

pub use crate::config::VatConfig;
pub use crate::error::RefError;
pub use crate::facade::RefFacade;
pub use crate::reference::{Promise, ResolutionState, Resolver};
pub use crate::selector::Selector;
pub use crate::settle::settled;
pub use crate::value::{Script, Value};
pub use crate::vat::Vat;

/// Result of a call against a reference.
pub type Result<T> = std::result::Result<T, RefError>;
