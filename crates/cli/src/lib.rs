//! wnb - watch a directory and snapshot it on every change
//!
//! The binary in `main.rs` only parses arguments; everything it runs lives here so
//! it can be driven from tests.

pub mod app;
pub mod pipeline;
pub mod shutdown;
pub mod util;

pub use app::{run, RunOptions};
pub use pipeline::BackupPipeline;
