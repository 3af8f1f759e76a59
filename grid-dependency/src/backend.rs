//! The Terraform HTTP backend's `backend_config` block — the three URLs a
//! `terraform init` handshake needs to talk to a given state's lock/unlock
//! endpoints. Built here (not in `grid-state`) because `GetDependencyGraph`
//! needs one of these per producer, and `grid-state`'s `GetStateConfig`
//! reuses the same shape for the state being bootstrapped.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "LockAddress")]
    pub lock_address: String,
    #[serde(rename = "UnlockAddress")]
    pub unlock_address: String,
}

/// `base_url` is the externally reachable root of the Terraform backend
/// (e.g. `https://grid.example.com/tfstate`), without a trailing slash.
pub fn backend_config_for(base_url: &str, guid: Uuid) -> BackendConfig {
    let base = base_url.trim_end_matches('/');
    BackendConfig {
        address: format!("{base}/{guid}"),
        lock_address: format!("{base}/{guid}/lock"),
        unlock_address: format!("{base}/{guid}/unlock"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_three_urls() {
        let guid = Uuid::nil();
        let cfg = backend_config_for("https://grid.example.com/tfstate/", guid);
        assert_eq!(cfg.address, format!("https://grid.example.com/tfstate/{guid}"));
        assert_eq!(
            cfg.lock_address,
            format!("https://grid.example.com/tfstate/{guid}/lock")
        );
        assert_eq!(
            cfg.unlock_address,
            format!("https://grid.example.com/tfstate/{guid}/unlock")
        );
    }
}
