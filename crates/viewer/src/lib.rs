//! `imagepoly-viewer` library crate.
//!
//! Configuration, manifest loading and the render session used by the
//! binary, exposed for integration testing. The entrypoint lives in
//! `main.rs`.

pub mod config;
pub mod manifest;
pub mod session;
