//! CLI module for reflexmem
//!
//! Handles command-line argument parsing.

pub mod args;

pub use args::{Args, Commands, EpisodeCommand, PatternArgs, Verbosity};
