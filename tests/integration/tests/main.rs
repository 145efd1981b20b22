//! End-to-End Integration Tests
//!
//! Two nodes, a connector and a proxy service, each with its own engine,
//! key and certificate, exchange requests and responses as bytes.

mod common;
mod hardening;
mod request_flow;
mod response_flow;
mod shared_engine;
