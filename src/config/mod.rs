//! Configuration Module
//! 
//! Handles configuration loading, validation, and the runtime settings
//! handed to the server.

pub mod manager;
pub mod proxy;
pub mod types;

pub use manager::ConfigManager;
pub use proxy::ProxyConfig;
pub use types::*;
