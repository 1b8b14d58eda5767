//! repowatch CLI library.
//!
//! Exposes the command modules for integration testing. In production
//! `repowatch` is used as a binary (main.rs).

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod report;
