pub mod board;
pub mod build;
pub mod chat;
pub mod config;
pub mod errors;
pub mod registry;
pub mod server;
