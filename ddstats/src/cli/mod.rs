//! Command-line interface
//!
//! CLI flags override the config file where both exist.

pub mod args;

pub use args::Args;
