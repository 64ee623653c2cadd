//! File I/O for documents and artifacts.
//!
//! - [`reader`]: parse documents on the blocking pool
//! - [`writer`]: atomic saves and copies

pub mod reader;
pub mod writer;

pub use reader::load_document;
pub use writer::{copy_atomic, remove_if_exists, save_document, temp_path_for};
