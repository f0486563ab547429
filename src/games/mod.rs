//! Game engines driven by the socket dispatcher.
//!
//! Each engine loads its group summary from the store, applies one operation
//! and persists the result. Engines hold no background state of their own;
//! the scheduler advances the city simulation by reloading summaries.

pub mod cases;
pub mod city;
