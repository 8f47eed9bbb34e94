//! Core primitives shared by EdgeRelay handlers and their platform adapters.

pub mod app;
pub mod body;
pub mod context;
pub mod encoding;
pub mod error;
pub mod handler;
pub mod http;
pub mod manifest;
pub mod middleware;
pub mod proxy;
pub mod response;
pub mod router;
