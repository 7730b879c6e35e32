//! C2PA-style provenance manifest: a claim plus two assertions (the
//! fixed `created`/`edited` actions, and a domain assertion recording
//! where the export came from and that it was redacted/consent-checked).
//! Reference signing hashes the canonical JSON; production would hand
//! the manifest to an external key-management service instead.

use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::error::Result;

const CLAIM_GENERATOR: &str = "threadloom/0.1.0";
const CREATED_AGENT: &str = "threadloom-pipeline";
const EDITED_AGENT: &str = "threadloom-anonymizer";

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub claim: Claim,
    pub assertions: Vec<Assertion>,
    pub signature: Signature,
}

#[derive(Debug, Clone, Serialize)]
pub struct Claim {
    #[serde(rename = "dc:title")]
    pub title: String,
    #[serde(rename = "dc:format")]
    pub format: String,
    pub claim_generator: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Assertion {
    pub label: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Signature {
    pub algorithm: String,
    pub certificate: String,
}

/// Builds the manifest for one export job. `source` is the same
/// `"<type>:<scope>"` tag used in each record's `source` field.
pub fn create_manifest(export_id: impl std::fmt::Display, record_count: usize, content_hash: &str, source: &str) -> Manifest {
    let manifest = Manifest {
        claim: Claim {
            title: format!("threadloom Export #{export_id}"),
            format: "application/jsonl".to_string(),
            claim_generator: CLAIM_GENERATOR.to_string(),
        },
        assertions: vec![
            Assertion {
                label: "c2pa.actions".to_string(),
                data: json!({
                    "actions": [
                        {"action": "c2pa.created", "softwareAgent": CREATED_AGENT},
                        {"action": "c2pa.edited", "softwareAgent": EDITED_AGENT},
                    ]
                }),
            },
            Assertion {
                label: "threadloom.provenance".to_string(),
                data: json!({
                    "source": source,
                    "record_count": record_count,
                    "content_hash": content_hash,
                    "pii_redacted": true,
                    "consent_verified": true,
                }),
            },
        ],
        signature: Signature {
            algorithm: "sha256-rsa".to_string(),
            certificate: "placeholder-use-kms-in-production".to_string(),
        },
    };

    tracing::info!(export_id = %export_id, records = record_count, "c2pa_manifest_created");
    manifest
}

/// Hashes the manifest's canonical JSON form. `serde_json::Value`'s map
/// is key-sorted (the `preserve_order` feature is not enabled), so this
/// is a stable input across runs regardless of the struct's field order.
pub fn sign_manifest(manifest: &Manifest) -> Result<String> {
    let canonical = serde_json::to_value(manifest)?;
    let bytes = serde_json::to_vec(&canonical)?;
    Ok(compute_content_hash(&bytes))
}

pub fn compute_content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_carries_fixed_actions() {
        let manifest = create_manifest(1, 3, "sha256:abc", "discord:42");
        let value = serde_json::to_value(&manifest).unwrap();
        let actions = &value["assertions"][0]["data"]["actions"];
        assert_eq!(actions.as_array().unwrap().len(), 2);
        assert_eq!(actions[0]["action"], "c2pa.created");
        assert_eq!(actions[1]["action"], "c2pa.edited");
    }

    #[test]
    fn domain_assertion_always_claims_redaction_and_consent() {
        let manifest = create_manifest(1, 0, "sha256:abc", "github:owner/repo");
        let value = serde_json::to_value(&manifest).unwrap();
        let data = &value["assertions"][1]["data"];
        assert_eq!(data["pii_redacted"], true);
        assert_eq!(data["consent_verified"], true);
    }

    #[test]
    fn signing_is_deterministic() {
        let manifest = create_manifest(7, 2, "sha256:abc", "discord:1");
        let a = sign_manifest(&manifest).unwrap();
        let b = sign_manifest(&manifest).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("sha256:"));
    }
}
