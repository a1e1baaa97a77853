//! Ignore predicates exempting pods from mutation
//!
//! Each predicate is a pure, side-effect-free test over the pod. The chain is
//! built once at startup and shared read-only; the review pipeline
//! short-circuits on the first match.

use k8s_openapi::api::core::v1::Pod;

/// A pure predicate deciding whether a pod is exempt from mutation
pub trait IgnorePredicate: Send + Sync {
    /// True if the pod should be allowed without mutation
    fn matches(&self, pod: &Pod) -> bool;
}

/// Ignores pods running in the host network namespace
#[derive(Clone, Copy, Debug, Default)]
pub struct HostNetwork;

impl IgnorePredicate for HostNetwork {
    fn matches(&self, pod: &Pod) -> bool {
        pod.spec
            .as_ref()
            .and_then(|spec| spec.host_network)
            .unwrap_or(false)
    }
}

/// Ignores pods carrying the supplied annotation, exact match
#[derive(Clone, Debug)]
pub struct WithAnnotation {
    key: String,
    value: String,
}

impl WithAnnotation {
    /// Create a predicate matching pods annotated `key=value`
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

impl IgnorePredicate for WithAnnotation {
    fn matches(&self, pod: &Pod) -> bool {
        annotation(pod, &self.key) == Some(self.value.as_str())
    }
}

/// Ignores pods lacking the supplied annotation
#[derive(Clone, Debug)]
pub struct WithoutAnnotation {
    key: String,
    value: String,
}

impl WithoutAnnotation {
    /// Create a predicate matching pods not annotated `key=value`
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

impl IgnorePredicate for WithoutAnnotation {
    fn matches(&self, pod: &Pod) -> bool {
        annotation(pod, &self.key) != Some(self.value.as_str())
    }
}

fn annotation<'a>(pod: &'a Pod, key: &str) -> Option<&'a str> {
    pod.metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(key))
        .map(String::as_str)
}

/// An ordered, read-only chain of ignore predicates
#[derive(Default)]
pub struct IgnoreChain {
    predicates: Vec<Box<dyn IgnorePredicate>>,
}

impl IgnoreChain {
    /// Build a chain from the supplied predicates, in order
    pub fn new(predicates: Vec<Box<dyn IgnorePredicate>>) -> Self {
        Self { predicates }
    }

    /// Build the chain from startup settings.
    ///
    /// Construction order is fixed: the host-network predicate first, then
    /// with-annotation entries, then without-annotation entries.
    pub fn from_settings(
        host_network: bool,
        with_annotations: &[(String, String)],
        without_annotations: &[(String, String)],
    ) -> Self {
        let mut predicates: Vec<Box<dyn IgnorePredicate>> = Vec::new();
        if host_network {
            predicates.push(Box::new(HostNetwork));
        }
        for (key, value) in with_annotations {
            predicates.push(Box::new(WithAnnotation::new(key, value)));
        }
        for (key, value) in without_annotations {
            predicates.push(Box::new(WithoutAnnotation::new(key, value)));
        }
        Self { predicates }
    }

    /// True if any predicate matches; stops at the first match
    pub fn matches(&self, pod: &Pod) -> bool {
        self.predicates.iter().any(|predicate| predicate.matches(pod))
    }

    /// Number of predicates in the chain
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// True if the chain holds no predicates
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}
