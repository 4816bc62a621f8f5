pub mod config;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod integration;
pub mod routes;
pub mod scheduler;
pub mod server;

#[cfg(test)]
mod mock;

/// Domain name used for coordinator names and device registry entries.
pub const DOMAIN: &str = "sonic";
