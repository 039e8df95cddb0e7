//! Terminal front-end for the workspace.
mod app;
mod main;

pub use app::*;
pub use main::*;
