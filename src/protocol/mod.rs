//! SOCKS5 Protocol Implementation
//! 
//! Wire format parsing and encoding for the method negotiation and the
//! CONNECT request.

pub mod constants;
pub mod handler;
pub mod types;

pub use constants::*;
pub use handler::Socks5Handler;
pub use types::*;
