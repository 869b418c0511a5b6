//! txscope Registry
//!
//! The table of declared transactional methods.
//!
//! Responsibilities:
//! - Validate method identifiers
//! - Build the method table once, at registration time
//! - Provide immutable lookup of a method's transaction options

mod builder;
mod error;
mod key;
mod table;

pub use builder::{MethodBuilder, MethodTableBuilder};
pub use error::{RegistryError, RegistryResult};
pub use key::MethodKey;
pub use table::MethodTable;
