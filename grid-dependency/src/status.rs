//! Pure edge-status derivation (§4.6's status matrix) and the wire strings
//! stored in `edges.status`.

use std::fmt;

/// One of the seven states an edge can be in. Stored as the lowercase,
/// hyphenated wire string (`"dirty-invalid"`, ...) in the `edges` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeStatus {
    Pending,
    Dirty,
    Clean,
    DirtyInvalid,
    CleanInvalid,
    MissingOutput,
    Mock,
}

impl EdgeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeStatus::Pending => "pending",
            EdgeStatus::Dirty => "dirty",
            EdgeStatus::Clean => "clean",
            EdgeStatus::DirtyInvalid => "dirty-invalid",
            EdgeStatus::CleanInvalid => "clean-invalid",
            EdgeStatus::MissingOutput => "missing-output",
            EdgeStatus::Mock => "mock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => EdgeStatus::Pending,
            "dirty" => EdgeStatus::Dirty,
            "clean" => EdgeStatus::Clean,
            "dirty-invalid" => EdgeStatus::DirtyInvalid,
            "clean-invalid" => EdgeStatus::CleanInvalid,
            "missing-output" => EdgeStatus::MissingOutput,
            "mock" => EdgeStatus::Mock,
            _ => return None,
        })
    }

    pub fn is_dirty(self) -> bool {
        matches!(self, EdgeStatus::Dirty | EdgeStatus::DirtyInvalid)
    }

    pub fn is_clean(self) -> bool {
        matches!(self, EdgeStatus::Clean | EdgeStatus::CleanInvalid)
    }
}

impl fmt::Display for EdgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// §4.6's pure status-derivation function.
///
/// `in_digest` is the producer's current output fingerprint (empty string
/// means "not yet observed"); `out_digest` is the consumer's last observed
/// copy of it; `validation_status` is `"invalid"` or anything else (treated
/// as valid); `output_exists` is false when the producer's output no longer
/// appears in its latest state.
pub fn derive_status(
    in_digest: &str,
    out_digest: &str,
    validation_status: &str,
    output_exists: bool,
) -> EdgeStatus {
    if !output_exists {
        return EdgeStatus::MissingOutput;
    }
    if in_digest.is_empty() {
        return EdgeStatus::Pending;
    }
    let drift = out_digest.is_empty() || in_digest != out_digest;
    let invalid = validation_status == "invalid";
    match (drift, invalid) {
        (true, true) => EdgeStatus::DirtyInvalid,
        (true, false) => EdgeStatus::Dirty,
        (false, true) => EdgeStatus::CleanInvalid,
        (false, false) => EdgeStatus::Clean,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_output_is_missing() {
        assert_eq!(derive_status("abc", "abc", "valid", false), EdgeStatus::MissingOutput);
    }

    #[test]
    fn empty_in_digest_is_pending() {
        assert_eq!(derive_status("", "", "valid", true), EdgeStatus::Pending);
    }

    #[test]
    fn mismatched_digests_drift_dirty() {
        assert_eq!(derive_status("a", "b", "valid", true), EdgeStatus::Dirty);
    }

    #[test]
    fn matching_digests_are_clean() {
        assert_eq!(derive_status("a", "a", "valid", true), EdgeStatus::Clean);
    }

    #[test]
    fn invalid_and_drifted_is_dirty_invalid() {
        assert_eq!(derive_status("a", "b", "invalid", true), EdgeStatus::DirtyInvalid);
    }

    #[test]
    fn invalid_but_converged_is_clean_invalid() {
        assert_eq!(derive_status("a", "a", "invalid", true), EdgeStatus::CleanInvalid);
    }

    #[test]
    fn never_observed_out_digest_drifts() {
        assert_eq!(derive_status("a", "", "valid", true), EdgeStatus::Dirty);
    }

    #[test]
    fn round_trips_through_wire_string() {
        for s in [
            EdgeStatus::Pending,
            EdgeStatus::Dirty,
            EdgeStatus::Clean,
            EdgeStatus::DirtyInvalid,
            EdgeStatus::CleanInvalid,
            EdgeStatus::MissingOutput,
            EdgeStatus::Mock,
        ] {
            assert_eq!(EdgeStatus::parse(s.as_str()), Some(s));
        }
    }
}
