pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod providers;
pub mod server;
pub mod session;
pub mod vault;
