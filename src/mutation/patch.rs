//! RFC 6902 patch generation
//!
//! Computes the minimal ordered edit between a pod and its mutated copy.
//! Both objects are compared as canonical `serde_json::Value`s (BTreeMap-backed
//! objects, so key order is stable) and the resulting operations are sorted by
//! path before encoding. The sort is a correctness requirement, not cosmetic:
//! two equivalent merges must always yield byte-identical patches.

use json_patch::{diff, Patch, PatchOperation};
use serde_json::Value;

use crate::{Error, Result};

/// Compute the ordered patch operations turning `before` into `after`.
///
/// Returns an empty vec when the two values are structurally equal.
pub fn diff_ops(before: &Value, after: &Value) -> Vec<PatchOperation> {
    let Patch(mut ops) = diff(before, after);
    ops.sort_by(|a, b| op_path(a).cmp(op_path(b)));
    ops
}

/// Encode patch operations as a single JSON array payload.
///
/// The payload is opaque to the review pipeline; it only ever travels as the
/// `patch` field of an admission response.
pub fn encode_patch(ops: &[PatchOperation]) -> Result<Vec<u8>> {
    serde_json::to_vec(ops).map_err(|e| Error::encode(format!("cannot encode patch as JSON: {e}")))
}

fn op_path(op: &PatchOperation) -> &str {
    match op {
        PatchOperation::Add(op) => op.path.as_str(),
        PatchOperation::Remove(op) => op.path.as_str(),
        PatchOperation::Replace(op) => op.path.as_str(),
        PatchOperation::Move(op) => op.path.as_str(),
        PatchOperation::Copy(op) => op.path.as_str(),
        PatchOperation::Test(op) => op.path.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn equal_values_yield_empty_patch() {
        let value = json!({"metadata": {"name": "coolpod"}});
        let ops = diff_ops(&value, &value.clone());
        assert!(ops.is_empty());
        assert_eq!(encode_patch(&ops).unwrap(), b"[]");
    }

    #[test]
    fn new_paths_become_add_operations() {
        let before = json!({"metadata": {"annotations": {"cool": "true"}}});
        let after = json!({"metadata": {"annotations": {"cool": "true", "supercool": "alsotrue"}}});
        let ops = diff_ops(&before, &after);
        let encoded = String::from_utf8(encode_patch(&ops).unwrap()).unwrap();
        assert_eq!(
            encoded,
            r#"[{"op":"add","path":"/metadata/annotations/supercool","value":"alsotrue"}]"#
        );
    }

    #[test]
    fn changed_leaves_become_replace_operations() {
        let before = json!({"spec": {"dnsPolicy": "ClusterFirst"}});
        let after = json!({"spec": {"dnsPolicy": "None"}});
        let encoded = String::from_utf8(encode_patch(&diff_ops(&before, &after)).unwrap()).unwrap();
        assert_eq!(encoded, r#"[{"op":"replace","path":"/spec/dnsPolicy","value":"None"}]"#);
    }

    #[test]
    fn removed_paths_become_remove_operations() {
        let before = json!({"metadata": {"labels": {"cool": "true"}, "name": "coolpod"}});
        let after = json!({"metadata": {"name": "coolpod"}});
        let encoded = String::from_utf8(encode_patch(&diff_ops(&before, &after)).unwrap()).unwrap();
        assert_eq!(encoded, r#"[{"op":"remove","path":"/metadata/labels"}]"#);
    }

    #[test]
    fn appended_elements_get_trailing_indices() {
        let before = json!({"spec": {"containers": [{"name": "coolcontainer"}]}});
        let after = json!({"spec": {"containers": [{"name": "coolcontainer"}, {"name": "coolercontainer"}]}});
        let encoded = String::from_utf8(encode_patch(&diff_ops(&before, &after)).unwrap()).unwrap();
        assert_eq!(
            encoded,
            r#"[{"op":"add","path":"/spec/containers/1","value":{"name":"coolercontainer"}}]"#
        );
    }

    #[test]
    fn operations_are_sorted_by_path() {
        let before = json!({"spec": {"dnsPolicy": "ClusterFirst"}});
        let after = json!({"spec": {
            "dnsConfig": {"nameservers": ["127.0.0.1"]},
            "dnsPolicy": "None",
        }});
        let ops = diff_ops(&before, &after);
        let paths: Vec<&str> = ops.iter().map(op_path).collect();
        assert_eq!(paths, vec!["/spec/dnsConfig", "/spec/dnsPolicy"]);
    }

    #[test]
    fn diff_output_is_byte_identical_across_runs() {
        let before = json!({
            "metadata": {"labels": {"cool": "true"}, "annotations": {"a": "1", "b": "2"}},
            "spec": {"containers": [{"name": "a"}], "dnsPolicy": "ClusterFirst"},
        });
        let after = json!({
            "metadata": {"labels": {"cool": "false"}, "annotations": {"a": "1", "c": "3"}},
            "spec": {"containers": [{"name": "a"}, {"name": "b"}], "dnsPolicy": "None"},
        });
        let first = encode_patch(&diff_ops(&before, &after)).unwrap();
        let second = encode_patch(&diff_ops(&before, &after)).unwrap();
        assert_eq!(first, second);
    }
}
