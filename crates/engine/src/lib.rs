//! Client side of the remote code analysis engine.
//!
//! The engine exposes four gRPC services (structural parse, per-file index build, call graph
//! build, taint path trace). This crate owns the channel lifecycle ([`ConnectionManager`]) and
//! a thin typed client over the generated stubs ([`EngineClient`]).

pub mod client;
pub mod connection;
pub mod error;
pub mod language;

pub mod proto {
    tonic::include_proto!("codeaudit");
}

pub use client::EngineClient;
pub use connection::{ConnectionManager, EngineSettings};
pub use error::{EngineError, Result};
pub use language::Language;
