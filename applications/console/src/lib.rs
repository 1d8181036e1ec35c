//! Twindeck console application
//!
//! Configuration loading and the actor thread that owns the lanes.

pub mod config;
pub mod engine;
pub mod error;

pub use config::ConsoleConfig;
pub use engine::{restore_sessions, save_sessions, Command, Engine};
pub use error::{ConsoleError, Result};
