//! CLI commands module.

mod config;
mod face;
mod util;

pub use config::ConfigCommand;
pub use face::FaceCommand;

pub(crate) use util::*;
