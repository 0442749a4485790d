//! Library surface for the pulseboard client (used by integration tests).

pub mod types;
pub mod ws;
