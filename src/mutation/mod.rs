//! PodMutation configuration model and patch generation
//!
//! A `PodMutation` describes what to merge into every admitted pod and how.
//! It is decoded once at startup from a YAML or JSON file, validated, and then
//! shared read-only across all concurrent reviews. The [`Patcher`]
//! implementation turns "original pod + mutation template" into an RFC 6902
//! JSON Patch via [`merge`] and [`patch`].

pub mod merge;
pub mod patch;

use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Annotation value marking a pod as already mutated.
///
/// Intended for use with `--ignore-pods-with-annotation KEY=mutated` so a pod
/// is never mutated twice.
pub const MUTATION_DONE: &str = "mutated";

/// Annotation value opting a pod out of mutation.
///
/// Intended for use with `--ignore-pods-with-annotation KEY=disabled`.
pub const MUTATION_DISABLED: &str = "disabled";

/// Expected `kind` of the configuration document
const POD_MUTATION_KIND: &str = "PodMutation";

/// A Patcher generates an RFC 6902 JSON patch for the supplied pod.
pub trait Patcher: Send + Sync {
    /// Compute the patch payload turning `pod` into its mutated form
    fn patch(&self, pod: &Pod) -> Result<Vec<u8>>;
}

/// A PodMutation specifies how a pod will be mutated.
///
/// Immutable after construction; concurrent reviews share one instance
/// read-only.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodMutation {
    /// API version of the configuration document, e.g. `phalanx.dev/v1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Kind of the configuration document; must be `PodMutation` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Metadata of the configuration document itself (name, labels, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    /// The mutation to apply
    #[serde(default)]
    pub spec: PodMutationSpec,
}

/// A PodMutationSpec specifies the fields of a pod that will be updated.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct PodMutationSpec {
    /// How template values combine with values already set on the pod
    #[serde(default)]
    pub strategy: MutationStrategy,

    /// The partial pod to merge into each admitted pod
    #[serde(default)]
    pub template: MutationTemplate,
}

/// A MutationTemplate holds the partial pod merged into each admitted pod.
///
/// Both parts are kept structural (`serde_json::Value`) because the merge
/// engine works on the pod's JSON representation, not typed structs. They must
/// be objects when present.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct MutationTemplate {
    /// Partial object metadata (labels, annotations) to merge in
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,

    /// Partial pod spec (containers, DNS policy, ...) to merge in
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub spec: Value,
}

/// A MutationStrategy determines how pod configuration will be merged.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct MutationStrategy {
    /// Overwrite values that are already set in the original pod
    #[serde(default)]
    pub overwrite: bool,

    /// Append to, rather than replacing, arrays in the original pod
    #[serde(default)]
    pub append: bool,
}

impl PodMutation {
    /// Decode a PodMutation from YAML or JSON bytes.
    ///
    /// YAML is a superset of JSON, so a single permissive decoder accepts
    /// both formats. Decode failure is fatal at startup, never at review
    /// time.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mutation: PodMutation = serde_yaml::from_slice(data)
            .map_err(|e| Error::config(format!("cannot decode PodMutation: {e}")))?;
        mutation.validate()?;
        Ok(mutation)
    }

    /// Validate the decoded configuration
    fn validate(&self) -> Result<()> {
        if let Some(kind) = &self.kind {
            if kind != POD_MUTATION_KIND {
                return Err(Error::config(format!(
                    "unexpected kind {kind:?}, expected {POD_MUTATION_KIND:?}"
                )));
            }
        }
        for (field, value) in [
            ("spec.template.metadata", &self.spec.template.metadata),
            ("spec.template.spec", &self.spec.template.spec),
        ] {
            if !value.is_null() && !value.is_object() {
                return Err(Error::config(format!("{field} must be an object when set")));
            }
        }
        Ok(())
    }

    /// The template as a single partial-pod value, ready for the merge engine
    fn template_value(&self) -> Value {
        let mut template = serde_json::Map::new();
        if !self.spec.template.metadata.is_null() {
            template.insert("metadata".to_string(), self.spec.template.metadata.clone());
        }
        if !self.spec.template.spec.is_null() {
            template.insert("spec".to_string(), self.spec.template.spec.clone());
        }
        Value::Object(template)
    }
}

impl Patcher for PodMutation {
    /// Generate an RFC 6902 JSON patch for the supplied pod.
    ///
    /// The pod is serialized to its canonical structural form, the template
    /// is merged into a copy, and the difference between the two is returned
    /// as an ordered patch payload. A pod equal to its mutated copy yields
    /// the empty patch `[]`.
    fn patch(&self, pod: &Pod) -> Result<Vec<u8>> {
        let original = serde_json::to_value(pod)
            .map_err(|e| Error::encode(format!("cannot encode original pod as JSON: {e}")))?;
        let mutated = merge::merge_value(&original, &self.template_value(), &self.spec.strategy)?;
        let ops = patch::diff_ops(&original, &mutated);
        patch::encode_patch(&ops)
    }
}
