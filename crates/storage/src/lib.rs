mod error;
mod memory;
mod record;
mod traits;

pub mod conformance;

pub use error::StorageError;
pub use memory::{MemorySnapshot, MemoryStore};
pub use record::{DocumentRecord, NewTransitionRecord, TransitionRecord};
pub use traits::DocketStore;
