pub mod atomic_write;
pub mod logging;
pub mod paths;

pub use atomic_write::{AtomicWriteError, write_file_atomic};
pub use paths::{Layout, LayoutError};
