pub mod bot;
pub mod commands;
pub mod config;
pub mod error;
pub mod llm;
pub mod platform;
pub mod server;
