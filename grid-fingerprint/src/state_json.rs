use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Per-output metadata carried alongside the raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputMeta {
    pub sensitive: bool,
    /// The state's `serial` at the time these outputs were parsed.
    pub serial: i64,
}

/// The subset of a Terraform state-JSON (version 4) document this crate cares
/// about: the serial, and the parsed output map.
#[derive(Debug, Clone, Default)]
pub struct ParsedOutputs {
    pub serial: i64,
    pub terraform_version: String,
    pub lineage: String,
    pub values: BTreeMap<String, Value>,
    pub meta: BTreeMap<String, OutputMeta>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed state JSON: {0}")]
    InvalidJson(String),
}

#[derive(Deserialize)]
struct RawOutput {
    #[serde(default)]
    value: Value,
    #[serde(default)]
    sensitive: bool,
}

#[derive(Deserialize, Default)]
struct RawState {
    #[serde(default)]
    terraform_version: String,
    #[serde(default)]
    serial: i64,
    #[serde(default)]
    lineage: String,
    #[serde(default)]
    outputs: Option<BTreeMap<String, RawOutput>>,
}

/// Parse a Terraform state-JSON (version 4) document's output block.
///
/// Tolerates an absent `outputs` key (returns empty maps). Any other
/// malformed JSON surfaces as [`ParseError::InvalidJson`].
pub fn parse_outputs(bytes: &[u8]) -> Result<ParsedOutputs, ParseError> {
    let raw: RawState =
        serde_json::from_slice(bytes).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let mut values = BTreeMap::new();
    let mut meta = BTreeMap::new();
    if let Some(outputs) = raw.outputs {
        for (key, out) in outputs {
            meta.insert(
                key.clone(),
                OutputMeta {
                    sensitive: out.sensitive,
                    serial: raw.serial,
                },
            );
            values.insert(key, out.value);
        }
    }

    Ok(ParsedOutputs {
        serial: raw.serial,
        terraform_version: raw.terraform_version,
        lineage: raw.lineage,
        values,
        meta,
    })
}

/// Validate that `bytes` is well-formed JSON without fully parsing the
/// Grid-relevant fields. Used by the state-content write path as a cheap
/// first gate before the heavier [`parse_outputs`] call.
pub fn is_well_formed_json(bytes: &[u8]) -> bool {
    serde_json::from_slice::<Value>(bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_outputs_block_is_empty() {
        let doc = br#"{"version":4,"serial":1,"terraform_version":"1.7.0","lineage":"abc"}"#;
        let parsed = parse_outputs(doc).unwrap();
        assert!(parsed.values.is_empty());
        assert!(parsed.meta.is_empty());
        assert_eq!(parsed.serial, 1);
    }

    #[test]
    fn parses_outputs_with_sensitivity() {
        let doc = br#"{
            "version": 4,
            "serial": 3,
            "outputs": {
                "vpc_id": {"value": "vpc-1", "type": "string", "sensitive": false},
                "db_password": {"value": "hunter2", "type": "string", "sensitive": true}
            }
        }"#;
        let parsed = parse_outputs(doc).unwrap();
        assert_eq!(parsed.values.get("vpc_id").unwrap(), "vpc-1");
        assert!(!parsed.meta["vpc_id"].sensitive);
        assert!(parsed.meta["db_password"].sensitive);
        assert_eq!(parsed.meta["vpc_id"].serial, 3);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_outputs(b"not json").is_err());
        assert!(!is_well_formed_json(b"not json"));
    }
}
