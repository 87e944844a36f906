//! Frontend components
//!
//! Command-line entry point for the `tlab-bench` binary.

pub mod cli;

pub use cli::main as cli_main;
