pub mod access;
pub mod config;
pub mod error;
pub mod http;
pub mod node;
pub mod persistence;
pub mod scheduler;
pub mod service;
pub mod shutdown;
