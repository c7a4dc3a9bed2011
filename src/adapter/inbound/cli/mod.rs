//! CLI module graph.

pub mod command;
pub mod config;
pub mod output;
pub mod quote;
pub mod resolve;
pub mod scenario;
