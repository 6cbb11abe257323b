pub mod access;
pub mod api;
pub mod config;
pub mod relay;
pub mod server;
