//! Durable policy artifacts.
//!
//! A solved policy is written as a pretty-printed JSON document:
//!
//! ```json
//! {
//!   "alphavec": [
//!     { "action": 0, "v": [-12.4, -12.4] },
//!     { "action": 2, "v": [-20.1, 4.9] }
//!   ],
//!   "beliefs": [[0.5, 0.5], [0.85, 0.15]]
//! }
//! ```
//!
//! `action` is `-1` for the placeholder vector of an unsolved engine. The
//! `beliefs` list records which points produced the vectors; it is optional
//! on load since evaluation only needs the vectors.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::alpha::AlphaVector;
use crate::belief::Belief;
use crate::error::{PbviError, Result};
use crate::logging::{event_names, Stage};
use crate::model::Model;

/// Action tag stored for the placeholder vector.
const PLACEHOLDER_ACTION: i64 = -1;

#[derive(Debug, Serialize, Deserialize)]
struct AlphaRecord {
    action: i64,
    v: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PolicyDocument {
    alphavec: Vec<AlphaRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    beliefs: Option<Vec<Vec<f64>>>,
}

/// Alpha vectors plus the belief points they were backed up at.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub alpha_vectors: Vec<AlphaVector>,
    pub beliefs: Vec<Belief>,
}

impl Policy {
    pub fn new(alpha_vectors: Vec<AlphaVector>, beliefs: Vec<Belief>) -> Self {
        Self {
            alpha_vectors,
            beliefs,
        }
    }

    /// Serialize to the pretty-printed artifact format.
    pub fn to_json(&self) -> Result<String> {
        let document = PolicyDocument {
            alphavec: self
                .alpha_vectors
                .iter()
                .map(|alpha| AlphaRecord {
                    action: alpha.action.map_or(PLACEHOLDER_ACTION, |a| a as i64),
                    v: alpha.values.clone(),
                })
                .collect(),
            beliefs: Some(self.beliefs.iter().map(|b| b.probs().to_vec()).collect()),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Parse and structurally validate an artifact.
    ///
    /// Syntax errors surface as [`PbviError::Json`]; a well-formed document
    /// with missing or inconsistent fields is a
    /// [`PbviError::MalformedArtifact`].
    pub fn from_json(text: &str) -> Result<Self> {
        let document: PolicyDocument = serde_json::from_str(text).map_err(|e| match e.classify() {
            serde_json::error::Category::Data => PbviError::MalformedArtifact(e.to_string()),
            _ => PbviError::Json(e),
        })?;

        if document.alphavec.is_empty() {
            return Err(PbviError::MalformedArtifact(
                "'alphavec' has no entries".to_string(),
            ));
        }
        let width = document.alphavec[0].v.len();

        let mut alpha_vectors = Vec::with_capacity(document.alphavec.len());
        for (idx, record) in document.alphavec.into_iter().enumerate() {
            if record.v.len() != width {
                return Err(PbviError::MalformedArtifact(format!(
                    "alphavec[{idx}] has {} values, expected {width}",
                    record.v.len()
                )));
            }
            if record.v.iter().any(|x| !x.is_finite()) {
                return Err(PbviError::MalformedArtifact(format!(
                    "alphavec[{idx}] contains a non-finite value"
                )));
            }
            let action = match record.action {
                PLACEHOLDER_ACTION => None,
                a if a >= 0 => Some(a as usize),
                a => {
                    return Err(PbviError::MalformedArtifact(format!(
                        "alphavec[{idx}] has invalid action {a}"
                    )))
                }
            };
            alpha_vectors.push(AlphaVector {
                action,
                values: record.v,
            });
        }

        let beliefs = document
            .beliefs
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(idx, probs)| {
                Belief::new(probs).map_err(|e| {
                    PbviError::MalformedArtifact(format!("beliefs[{idx}]: {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            alpha_vectors,
            beliefs,
        })
    }

    /// Check that every vector and belief fits `model`.
    pub fn check_against<M: Model + ?Sized>(&self, model: &M) -> Result<()> {
        let num_states = model.num_states();
        for alpha in &self.alpha_vectors {
            if alpha.len() != num_states {
                return Err(PbviError::DimensionMismatch {
                    expected: num_states,
                    actual: alpha.len(),
                });
            }
            if let Some(action) = alpha.action {
                model.ensure_action(action)?;
            }
        }
        for belief in &self.beliefs {
            belief.ensure_len(num_states)?;
        }
        Ok(())
    }
}

/// Reads and writes policy artifacts at a fixed path.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    path: PathBuf,
}

impl PolicyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the policy atomically via a sibling temp file.
    pub fn save(&self, policy: &Policy) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = policy.to_json()?;
        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            writer.write_all(json.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        fs::rename(&temp_path, &self.path)?;

        crate::log_event!(
            INFO,
            event_names::POLICY_SAVED,
            Stage::Policy,
            "policy written",
            path = tracing::field::display(self.path.display()),
            alpha_vectors = policy.alpha_vectors.len(),
            beliefs = policy.beliefs.len()
        );
        Ok(())
    }

    pub fn load(&self) -> Result<Policy> {
        let text = fs::read_to_string(&self.path)?;
        let policy = Policy::from_json(&text)?;
        crate::log_event!(
            INFO,
            event_names::POLICY_LOADED,
            Stage::Policy,
            "policy loaded",
            path = tracing::field::display(self.path.display()),
            alpha_vectors = policy.alpha_vectors.len()
        );
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TabularModel;

    fn sample_policy() -> Policy {
        Policy::new(
            vec![
                AlphaVector::new(0, vec![-12.25, 0.1 + 0.2]),
                AlphaVector::new(2, vec![1.0 / 3.0, -100.0]),
            ],
            vec![Belief::uniform(2), Belief::new(vec![0.85, 0.15]).unwrap()],
        )
    }

    #[test]
    fn json_round_trip_is_exact() {
        let policy = sample_policy();
        let back = Policy::from_json(&policy.to_json().unwrap()).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn placeholder_is_minus_one() {
        let policy = Policy::new(vec![AlphaVector::placeholder(2)], vec![]);
        let json = policy.to_json().unwrap();
        assert!(json.contains("\"action\": -1"));
        let back = Policy::from_json(&json).unwrap();
        assert!(back.alpha_vectors[0].is_placeholder());
    }

    #[test]
    fn beliefs_are_optional() {
        let policy = Policy::from_json(r#"{"alphavec": [{"action": 1, "v": [0.0, 2.5]}]}"#).unwrap();
        assert_eq!(policy.alpha_vectors, vec![AlphaVector::new(1, vec![0.0, 2.5])]);
        assert!(policy.beliefs.is_empty());
    }

    #[test]
    fn missing_or_empty_alphavec_is_malformed() {
        for text in [r#"{"beliefs": []}"#, r#"{"alphavec": []}"#] {
            assert!(matches!(
                Policy::from_json(text),
                Err(PbviError::MalformedArtifact(_))
            ));
        }
    }

    #[test]
    fn ragged_or_bad_action_is_malformed() {
        let ragged = r#"{"alphavec": [{"action": 0, "v": [1.0]}, {"action": 1, "v": [1.0, 2.0]}]}"#;
        assert!(matches!(
            Policy::from_json(ragged),
            Err(PbviError::MalformedArtifact(_))
        ));
        let bad_action = r#"{"alphavec": [{"action": -4, "v": [1.0]}]}"#;
        assert!(matches!(
            Policy::from_json(bad_action),
            Err(PbviError::MalformedArtifact(_))
        ));
    }

    #[test]
    fn syntax_error_is_json_error() {
        assert!(matches!(
            Policy::from_json("{\"alphavec\": ["),
            Err(PbviError::Json(_))
        ));
    }

    #[test]
    fn check_against_model() {
        let tiger = TabularModel::tiger();
        assert!(sample_policy().check_against(&tiger).is_ok());

        let wide = Policy::new(vec![AlphaVector::new(0, vec![0.0; 3])], vec![]);
        assert!(matches!(
            wide.check_against(&tiger),
            Err(PbviError::DimensionMismatch { expected: 2, actual: 3 })
        ));

        let unknown = Policy::new(vec![AlphaVector::new(7, vec![0.0; 2])], vec![]);
        assert!(matches!(
            unknown.check_against(&tiger),
            Err(PbviError::UnknownAction { .. })
        ));
    }

    #[test]
    fn store_writes_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::new(dir.path().join("nested").join("tiger.policy.json"));
        let policy = sample_policy();
        store.save(&policy).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.load().unwrap(), policy);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
