// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line interface.
//!
//! Argument parsing, the `prepare` and `probe` commands, and the console output
//! macros shared with the library.

// Modules
/// CLI arguments.
pub mod args;

/// Console output macros and verbosity control.
pub mod logging;

/// `prepare` and `probe` commands.
pub mod prepare;
