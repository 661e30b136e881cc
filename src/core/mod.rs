pub mod api;
pub mod config;
pub mod execution;
pub mod terminal;
