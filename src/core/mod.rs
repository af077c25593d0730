//! Windowed reads over append-only CSV logs.
//!
//! The log is memory-mapped per request and treated as an immutable
//! snapshot. Lookups go through [`locate`], reads through [`read_window`].

pub mod error;
pub mod locate;
pub mod log_view;
pub mod mmap;
pub mod query;
pub mod sampler;
pub mod window;

pub use error::{Error, Result};
pub use locate::{locate, Located, SeekResult};
pub use log_view::{Line, LogView};
pub use mmap::MmapFile;
pub use query::WindowQuery;
pub use sampler::{SamplingState, StrideSampler};
pub use window::{read_window, stream, Projection, WindowConfig, WindowStats};
