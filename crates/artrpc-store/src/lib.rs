//! The store document that carries state between the host and the Arturo
//! interpreter, and the synchronizer that moves it between disk and memory.
//!
//! The interpreter owns `signals` and `vars`; the host only ever adds the
//! transient `output`/`error`/`error_code` fields, in memory, after a run.

pub mod error;
pub mod model;
pub mod sync;

pub use error::StoreError;
pub use model::{DEFAULT_SIGNAL_KEY, RunMetadata, SIGNAL_SEPARATOR, Signal, Store};
pub use sync::StoreSynchronizer;
