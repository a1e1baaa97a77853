//! Phalanx - mutating admission webhook for pods
//!
//! Phalanx serves a Kubernetes mutating admission webhook that patches pods
//! according to a declarative `PodMutation` configuration. For every admission
//! review it either:
//!
//! - allows the pod unmodified (when an ignore predicate matches),
//! - allows it with an RFC 6902 JSON Patch computed by deep-merging the
//!   configured mutation template into the pod, or
//! - rejects the review with a structured status (wrong resource kind,
//!   undecodable object, merge failure).
//!
//! Every review is independent and stateless: the only process-wide state is
//! the immutable `PodMutation`, the immutable ignore chain, and the review
//! counter.
//!
//! # Modules
//!
//! - [`mutation`] - PodMutation config model, merge engine, and patch generator
//! - [`admission`] - Admission review envelope, ignore predicates, and the
//!   review pipeline
//! - [`webhook`] - HTTP transport for the admission review endpoint
//! - [`server`] - Dual listeners (TLS webhook + insecure health/metrics) with
//!   graceful shutdown
//! - [`error`] - Error types for the webhook

#![deny(missing_docs)]

pub mod admission;
pub mod error;
pub mod mutation;
pub mod server;
pub mod webhook;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default port for the TLS-protected webhook listener
pub const DEFAULT_WEBHOOK_PORT: u16 = 10002;

/// Default port for the insecure health/metrics listener
pub const DEFAULT_INSECURE_PORT: u16 = 10003;
