pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod llm;
pub mod shared;
pub mod tickets;
