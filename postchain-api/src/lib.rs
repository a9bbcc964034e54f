//! # Postchain API Server Library
//!
//! HTTP surface of Postchain: users sign up and log in, then build chains of
//! posts whose values derive from their parents'.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Extractors that reject with the JSON error envelope
//! - `middleware`: Authentication, rate limiting, security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
