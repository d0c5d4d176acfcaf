//! Untrusted command execution.
//!
//! The operations relay feeds model output to a shell verbatim; that is the
//! system's defining feature, and also the reason execution is isolated
//! behind the `UntrustedRunner` trait: a sandboxed implementation can be
//! substituted without touching the relay logic.

pub mod error;
pub mod runner;

pub use error::ExecError;
pub use runner::{ExecResult, ShellRunner, UntrustedRunner};
