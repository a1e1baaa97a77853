//! Admission review envelope types
//!
//! Serde models for the `admission.k8s.io/v1` review envelope. Only the
//! fields the pipeline consumes are modeled; unknown fields are ignored on
//! decode. The patch payload serializes as base64, matching the Kubernetes
//! `[]byte` wire convention.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Patch type tag carried alongside every patch payload
pub const PATCH_TYPE_JSON_PATCH: &str = "JSONPatch";

/// `Status.status` value on every rejection
pub const STATUS_FAILURE: &str = "Failure";

/// Fully-qualified kind of an object under review
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct GroupVersionKind {
    /// API group, empty for the core group
    #[serde(default)]
    pub group: String,

    /// API version within the group
    #[serde(default)]
    pub version: String,

    /// Object kind, e.g. `Pod`
    #[serde(default)]
    pub kind: String,
}

/// Fully-qualified resource being requested
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct GroupVersionResource {
    /// API group, empty for the core group
    #[serde(default)]
    pub group: String,

    /// API version within the group
    #[serde(default)]
    pub version: String,

    /// Resource name, e.g. `pods`
    #[serde(default)]
    pub resource: String,
}

/// The resource this webhook reviews
pub fn pod_resource() -> GroupVersionResource {
    GroupVersionResource {
        group: String::new(),
        version: "v1".to_string(),
        resource: "pods".to_string(),
    }
}

/// Render a GroupVersionResource the way Kubernetes does in messages
pub fn gvr_string(gvr: &GroupVersionResource) -> String {
    if gvr.group.is_empty() {
        format!("{}, Resource={}", gvr.version, gvr.resource)
    } else {
        format!("{}/{}, Resource={}", gvr.group, gvr.version, gvr.resource)
    }
}

/// Render a GroupVersionKind the way Kubernetes does in messages
pub fn gvk_string(gvk: &GroupVersionKind) -> String {
    format!("{}/{}, Kind={}", gvk.group, gvk.version, gvk.kind)
}

/// Classification of a rejected review
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectionReason {
    /// The request itself is wrong: non-pod resource or undecodable object
    Invalid,
    /// The review failed internally: merge or encode error
    InternalError,
}

impl RejectionReason {
    /// The `Status.reason` wire value
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid",
            Self::InternalError => "InternalError",
        }
    }
}

/// The outer admission review envelope
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    /// Envelope API version, echoed back in the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Envelope kind, echoed back in the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// The inbound request; present on requests, absent on responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,

    /// The outbound response; present on responses, absent on requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

/// One admission request: ephemeral, never retained beyond the call
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    /// Request identifier, echoed into the response on success
    #[serde(default)]
    pub uid: String,

    /// Kind of the object under review
    #[serde(default)]
    pub kind: GroupVersionKind,

    /// Resource being requested; must be `pods` for this webhook
    #[serde(default)]
    pub resource: GroupVersionResource,

    /// Namespace of the object under review
    #[serde(default)]
    pub namespace: String,

    /// Name of the object under review
    #[serde(default)]
    pub name: String,

    /// The raw encoded object under review
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
}

/// The admission decision: exactly one of allowed-unmodified,
/// allowed-with-patch, or rejected
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    /// Identifier of the request this responds to
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    /// Whether the object is admitted
    #[serde(default)]
    pub allowed: bool,

    /// Failure status; present only on rejections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Status>,

    /// Patch payload, base64 on the wire; present only with a patch
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Option::is_none")]
    pub patch: Option<Vec<u8>>,

    /// Patch type tag; always `JSONPatch` when a patch is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
}

impl AdmissionResponse {
    /// An allowed-unmodified response (ignored pods)
    pub fn allowed_unmodified() -> Self {
        Self { allowed: true, ..Default::default() }
    }

    /// An allowed-with-patch response carrying the patch payload
    pub fn with_patch(uid: String, patch: Vec<u8>) -> Self {
        Self {
            uid,
            allowed: true,
            patch: Some(patch),
            patch_type: Some(PATCH_TYPE_JSON_PATCH.to_string()),
            ..Default::default()
        }
    }

    /// A rejected response carrying a failure reason and message
    pub fn rejection(reason: RejectionReason, message: impl Into<String>) -> Self {
        Self {
            result: Some(Status {
                status: Some(STATUS_FAILURE.to_string()),
                reason: Some(reason.as_str().to_string()),
                message: Some(message.into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| BASE64.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_envelope_decodes_from_api_server_json() {
        let body = json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "", "version": "v1", "kind": "Pod"},
                "resource": {"group": "", "version": "v1", "resource": "pods"},
                "namespace": "coolnamespace",
                "name": "coolpod",
                "object": {"metadata": {"name": "coolpod"}},
                "operation": "CREATE",
            },
        });
        let review: AdmissionReview = serde_json::from_value(body).unwrap();
        let request = review.request.unwrap();
        assert_eq!(request.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert_eq!(request.resource, pod_resource());
        assert_eq!(request.namespace, "coolnamespace");
        assert!(request.object.is_some());
    }

    #[test]
    fn patch_serializes_as_base64() {
        let response = AdmissionResponse::with_patch("uid-1".to_string(), b"[]".to_vec());
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["patch"], json!("W10="));
        assert_eq!(encoded["patchType"], json!("JSONPatch"));
        assert_eq!(encoded["allowed"], json!(true));

        let decoded: AdmissionResponse = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded.patch.as_deref(), Some(b"[]".as_slice()));
    }

    #[test]
    fn allowed_unmodified_carries_no_patch_or_result() {
        let encoded = serde_json::to_value(AdmissionResponse::allowed_unmodified()).unwrap();
        assert_eq!(encoded["allowed"], json!(true));
        assert!(encoded.get("patch").is_none());
        assert!(encoded.get("patchType").is_none());
        assert!(encoded.get("result").is_none());
    }

    #[test]
    fn rejection_carries_failure_status() {
        let response = AdmissionResponse::rejection(RejectionReason::Invalid, "cannot review non-pod resource");
        assert!(!response.allowed);
        let status = response.result.unwrap();
        assert_eq!(status.status.as_deref(), Some(STATUS_FAILURE));
        assert_eq!(status.reason.as_deref(), Some("Invalid"));
        assert_eq!(status.message.as_deref(), Some("cannot review non-pod resource"));
    }

    #[test]
    fn gvr_rendering_matches_kubernetes_style() {
        assert_eq!(gvr_string(&pod_resource()), "v1, Resource=pods");
        let configmaps = GroupVersionResource {
            group: "apps".to_string(),
            version: "v1".to_string(),
            resource: "deployments".to_string(),
        };
        assert_eq!(gvr_string(&configmaps), "apps/v1, Resource=deployments");
    }
}
