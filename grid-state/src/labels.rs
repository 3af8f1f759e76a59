//! Validates a label map against the current [`LabelPolicyRow`]: key count,
//! per-value length, allowed-value sets, and required keys.

use grid_data::{GridError, LabelPolicyRow};
use grid_labels::{LabelMap, LabelValue};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Deserialize, Default)]
struct AllowedKey {
    #[serde(default)]
    required: bool,
    #[serde(default)]
    allowed_values: Vec<LabelValue>,
}

pub fn validate_labels(policy: &LabelPolicyRow, labels: &LabelMap) -> Result<(), GridError> {
    if labels.len() > policy.max_keys as usize {
        return Err(GridError::InvalidArgument(format!(
            "label policy permits at most {} keys, got {}",
            policy.max_keys,
            labels.len()
        )));
    }

    let allowed: BTreeMap<String, AllowedKey> =
        serde_json::from_value(policy.allowed_keys.clone()).map_err(|e| {
            GridError::Internal(format!("malformed label policy allowed_keys JSON: {e}"))
        })?;

    for (key, value) in labels {
        if value.to_string().len() > policy.max_value_len as usize {
            return Err(GridError::InvalidArgument(format!(
                "label '{key}' exceeds the maximum value length of {}",
                policy.max_value_len
            )));
        }
        if let Some(constraint) = allowed.get(key) {
            if !constraint.allowed_values.is_empty() && !constraint.allowed_values.contains(value)
            {
                return Err(GridError::InvalidArgument(format!(
                    "label '{key}' has a value outside the allowed set"
                )));
            }
        }
    }

    for (key, constraint) in &allowed {
        if constraint.required && !labels.contains_key(key) {
            return Err(GridError::InvalidArgument(format!(
                "label policy requires key '{key}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy(allowed_keys: serde_json::Value) -> LabelPolicyRow {
        LabelPolicyRow {
            version: 1,
            max_keys: 10,
            max_value_len: 64,
            allowed_keys,
        }
    }

    #[test]
    fn rejects_too_many_keys() {
        let policy = LabelPolicyRow {
            max_keys: 1,
            ..policy(json!({}))
        };
        let mut labels = LabelMap::new();
        labels.insert("a".into(), LabelValue::Str("1".into()));
        labels.insert("b".into(), LabelValue::Str("2".into()));
        assert!(validate_labels(&policy, &labels).is_err());
    }

    #[test]
    fn rejects_disallowed_value() {
        let policy = policy(json!({"env": {"required": true, "allowed_values": ["dev", "prod"]}}));
        let mut labels = LabelMap::new();
        labels.insert("env".into(), LabelValue::Str("staging".into()));
        assert!(validate_labels(&policy, &labels).is_err());
    }

    #[test]
    fn rejects_missing_required_key() {
        let policy = policy(json!({"env": {"required": true, "allowed_values": []}}));
        let labels = LabelMap::new();
        assert!(validate_labels(&policy, &labels).is_err());
    }

    #[test]
    fn accepts_valid_labels() {
        let policy = policy(json!({"env": {"required": true, "allowed_values": ["dev", "prod"]}}));
        let mut labels = LabelMap::new();
        labels.insert("env".into(), LabelValue::Str("dev".into()));
        assert!(validate_labels(&policy, &labels).is_ok());
    }
}
