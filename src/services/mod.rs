//! Business logic sitting between the routes and the persistence layer.

pub mod chat;
pub mod dispatcher;
pub mod documentation;
pub mod health_service;
pub mod scheduler;
pub mod session_service;
pub mod websocket_service;
