//! Data Relay Module
//! 
//! Handles bidirectional data relay between client and destination.

pub mod engine;
pub mod pair;
pub mod session;

pub use engine::{CopyOutcome, RelayEngine};
pub use pair::RelayPair;
pub use session::{ConnectionStats, DirectionEnd, RelaySession};
