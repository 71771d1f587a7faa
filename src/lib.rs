//! Incident desk: a session-scoped incident store over a pluggable backing
//! service, exposed as a JSON API for the dashboard.

pub mod api;
pub mod app;
pub mod auth;
pub mod backend;
pub mod config;
pub mod domain;
pub mod error;
pub mod filter;
pub mod logging;
pub mod middleware;
pub mod responder;
pub mod routes;
pub mod store;
