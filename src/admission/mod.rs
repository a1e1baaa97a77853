//! Admission review handling
//!
//! The [`review`] module defines the admission review envelope exchanged with
//! the API server, [`ignore`] the predicate chain exempting pods from
//! mutation, and [`mutator`] the review pipeline turning a decoded admission
//! request into a response.

pub mod ignore;
pub mod mutator;
pub mod review;

pub use mutator::{MutatorConfig, PodMutator};
pub use review::{AdmissionRequest, AdmissionResponse, AdmissionReview};

/// A Reviewer reviews admission requests.
///
/// The webhook transport is generic over this trait, so it carries no
/// dependency on the merge/diff internals.
pub trait Reviewer: Send + Sync {
    /// Produce a definite response for the supplied admission request
    fn review(&self, request: &AdmissionRequest) -> AdmissionResponse;
}
