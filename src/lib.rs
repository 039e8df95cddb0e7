//! Lumina note and file workspace library
//!
//! This library keeps notes and uploaded files in a local key-value store and
//! can ask a hosted generative model to summarize notes or describe files.

mod ai;
mod autosave;
mod cli;
mod config;
mod editor;
mod errors;
mod file_item;
mod helper;
mod note;
mod storage;
mod types;
mod workspace;

// Re-export key components
pub use ai::*;
pub use autosave::*;
pub use cli::*;
pub use config::*;
pub use editor::*;
pub use errors::*;
pub use file_item::*;
pub use helper::*;
pub use note::*;
pub use storage::*;
pub use types::*;
pub use workspace::*;
