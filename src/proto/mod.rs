//! Vendored gRPC bindings for the synthesis service.
//!
//! The source contract lives in `proto/tts.proto`. The bindings are checked
//! in rather than produced at build time so the crate builds without a
//! `protoc` toolchain; regenerate with `tonic-build` when the contract
//! changes.

#[path = "tts.v1.rs"]
pub mod v1;
