//! txscope Resources
//!
//! Resource participants that make external state follow a transaction's
//! outcome.
//!
//! Responsibilities:
//! - Stage file contents and publish them atomically on commit
//! - Buffer keyed writes to a shared in-memory map until commit

mod file;
mod map;

pub use file::StagedFile;
pub use map::{MapWriter, TransactionalMap};
