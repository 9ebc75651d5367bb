//! Core domain models for a relay run
//!
//! This module defines the run configuration and the state a run moves
//! through from fetch to archive.

pub mod config;
pub mod state;

pub use config::RelayConfig;
pub use state::*;
