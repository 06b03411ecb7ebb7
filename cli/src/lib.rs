//! CLI utilities for faceprint.
//!
//! Configuration, file layout, input parsing and output formatting shared
//! by the `faceprint` binary.

pub mod config;
pub mod input;
pub mod output;
pub mod paths;

pub use config::{Config, Context};
pub use input::{load_document, parse_document, read_text, InputError};
pub use output::{Output, OutputFormat};
pub use paths::Paths;
