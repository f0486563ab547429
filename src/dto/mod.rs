//! Wire-level request and response types.

pub mod health;
pub mod session;
pub mod ws;
