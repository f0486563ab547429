//! Persistence layer: entity models, the [`broker_store::BrokerStore`] trait and
//! its backends.

pub mod broker_store;
pub mod models;
pub mod storage;
