//! Review pipeline for pod admission requests
//!
//! `PodMutator` drives one admission request through resource validation,
//! object decode, the ignore chain, and patch generation, mapping every
//! failure mode to a structured rejection. The pipeline holds no mutable
//! state beyond the injected metrics sink, so a single instance is safe for
//! unlimited concurrent use.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, info};

use super::ignore::IgnoreChain;
use super::review::{
    gvk_string, gvr_string, pod_resource, AdmissionRequest, AdmissionResponse, RejectionReason,
};
use super::Reviewer;
use crate::mutation::Patcher;

/// Counter incremented exactly once per completed review
pub const PODS_REVIEWED_TOTAL: &str = "pods_reviewed_total";

/// Terminal classification of one review, used as the `result` counter label
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// The pod was allowed with a patch
    Mutated,
    /// An ignore predicate matched; the pod was allowed unmodified
    Ignored,
    /// The review was rejected
    Error,
}

impl ReviewOutcome {
    /// The counter label value
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mutated => "mutated",
            Self::Ignored => "ignored",
            Self::Error => "error",
        }
    }
}

/// Review counter sink, keyed by kind, namespace, and outcome.
///
/// A thin wrapper over the process-wide metrics recorder so the measurement
/// key is an explicit dependency of the pipeline rather than a hidden global.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReviewMetrics;

impl ReviewMetrics {
    /// Create the sink and register the counter description
    pub fn new() -> Self {
        metrics::describe_counter!(PODS_REVIEWED_TOTAL, "Number of pods reviewed.");
        Self
    }

    fn record(&self, kind: &str, namespace: &str, outcome: ReviewOutcome) {
        metrics::counter!(
            PODS_REVIEWED_TOTAL,
            "kind" => kind.to_string(),
            "namespace" => namespace.to_string(),
            "result" => outcome.as_str(),
        )
        .increment(1);
    }
}

/// Configuration for a [`PodMutator`]
#[derive(Default)]
pub struct MutatorConfig {
    /// Predicates exempting pods from mutation, checked in order
    pub ignore: IgnoreChain,
}

/// A Reviewer that mutates pods
pub struct PodMutator<P> {
    patcher: Arc<P>,
    ignore: IgnoreChain,
    metrics: ReviewMetrics,
}

impl<P: Patcher> PodMutator<P> {
    /// Create a new PodMutator with the supplied patcher and configuration
    pub fn new(patcher: Arc<P>, config: MutatorConfig) -> Self {
        Self {
            patcher,
            ignore: config.ignore,
            metrics: ReviewMetrics::new(),
        }
    }

    fn reject(
        &self,
        request: &AdmissionRequest,
        kind: &str,
        reason: RejectionReason,
        message: String,
    ) -> AdmissionResponse {
        self.metrics.record(kind, &request.namespace, ReviewOutcome::Error);
        AdmissionResponse::rejection(reason, message)
    }
}

impl<P: Patcher> Reviewer for PodMutator<P> {
    /// Approve and patch one pod admission request.
    ///
    /// Every exit path produces a definite response and exactly one counter
    /// increment, including failures before the object is decoded.
    fn review(&self, request: &AdmissionRequest) -> AdmissionResponse {
        let kind = gvk_string(&request.kind);
        let span = tracing::info_span!(
            "review",
            kind = %kind,
            namespace = %request.namespace,
            name = %request.name,
        );
        let _guard = span.enter();

        let expected = pod_resource();
        if request.resource != expected {
            let expected = gvr_string(&expected);
            let observed = gvr_string(&request.resource);
            info!(expected = %expected, observed = %observed, "cannot review non-pod resource");
            return self.reject(
                request,
                &kind,
                RejectionReason::Invalid,
                format!("cannot review non-pod resource: expected {expected}, observed {observed}"),
            );
        }

        let pod: Pod = match &request.object {
            Some(object) => match serde_json::from_value(object.clone()) {
                Ok(pod) => pod,
                Err(e) => {
                    info!(error = %e, "cannot decode object as a pod");
                    return self.reject(
                        request,
                        &kind,
                        RejectionReason::Invalid,
                        format!("cannot decode object as a pod: {e}"),
                    );
                }
            },
            None => {
                info!("cannot decode object as a pod");
                return self.reject(
                    request,
                    &kind,
                    RejectionReason::Invalid,
                    "cannot decode object as a pod: admission request has no object".to_string(),
                );
            }
        };

        if self.ignore.matches(&pod) {
            info!("not mutating ignored pod");
            self.metrics.record(&kind, &request.namespace, ReviewOutcome::Ignored);
            return AdmissionResponse::allowed_unmodified();
        }

        match self.patcher.patch(&pod) {
            Ok(patch) => {
                debug!("mutated pod");
                self.metrics.record(&kind, &request.namespace, ReviewOutcome::Mutated);
                AdmissionResponse::with_patch(request.uid.clone(), patch)
            }
            Err(e) => {
                info!(error = %e, "cannot patch pod");
                self.reject(
                    request,
                    &kind,
                    RejectionReason::InternalError,
                    format!("cannot patch pod: {e}"),
                )
            }
        }
    }
}
