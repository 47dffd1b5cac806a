//! Kubernetes resource management for per-user game sessions.
//!
//! Each user maps to a fixed set of four objects (pod, service, ingress,
//! strip-prefix middleware) with names derived deterministically from the
//! user id, so cleanup can reconstruct them without a database lookup.

mod client;
mod driver;
mod error;
pub mod objects;

pub use client::{ClusterApi, HttpClusterClient};
pub use driver::{GameDriver, PodPhase};
pub use error::{ClusterError, ClusterResult, DeleteOutcome};
pub use objects::ObjectKind;
