//! Command-line interface.
//!
//! Provides argument parsing, command dispatch and the terminal notifiers
//! used during bootstrap.

pub mod args;
pub mod commands;
pub mod notify;

pub use args::{Cli, Commands};
pub use notify::{ConsoleNotifier, LogNotifier};
