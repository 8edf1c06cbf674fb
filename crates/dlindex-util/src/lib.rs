//! Shared utilities for dlindex.
//!
//! This crate provides cross-cutting concerns used by all other dlindex crates:
//! error types, filesystem helpers, content hashing, child process spawning
//! with secret redaction, and terminal status output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod process;
pub mod progress;
pub mod redact;
