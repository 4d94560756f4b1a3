//! shiori CLI library
//!
//! Command-line front end over `shiori-core` and `shiori-engine`. Chapter
//! files are segmented and measured here; saved positions can be merged across
//! devices or dry-run restored against a simulated layout.

pub mod commands;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod output;
pub mod progress;

pub use error::{CliError, CliResult};
