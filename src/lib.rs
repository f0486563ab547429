//! Library crate for aula-broker, exposing modules for the binary and integration tests.

pub mod clock;
pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod games;
pub mod messages;
pub mod routes;
pub mod services;
pub mod state;
