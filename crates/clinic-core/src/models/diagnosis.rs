use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ids;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiagnosisStatus {
    Success,
    Failed,
    Pending,
    #[serde(other)]
    Unknown,
}

/// Per-label confidence scores for one eye, in the order the backend sent them
pub type ConfidenceMap = IndexMap<String, f64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceVector {
    #[serde(default)]
    pub left_fundus_diagnose: Option<ConfidenceMap>,
    #[serde(default)]
    pub right_fundus_diagnose: Option<ConfidenceMap>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisResult {
    #[serde(default)]
    pub final_diagnosis: BTreeMap<String, String>,
    #[serde(default)]
    pub evidence_vector: Option<EvidenceVector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    #[serde(deserialize_with = "ids::id")]
    pub id: String,
    #[serde(default)]
    pub left_fundus_image: Option<String>,
    #[serde(default)]
    pub right_fundus_image: Option<String>,
    pub status: DiagnosisStatus,
    #[serde(default)]
    pub result: Option<DiagnosisResult>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub medical_notes: Option<String>,
    #[serde(default)]
    pub worker_id: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(deserialize_with = "ids::id")]
    pub patient: String,
    #[serde(default)]
    pub physician: Option<i64>,
    #[serde(default, deserialize_with = "ids::optional_id")]
    pub appointment: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
}

impl Diagnosis {
    pub fn evidence(&self) -> Option<&EvidenceVector> {
        self.result.as_ref()?.evidence_vector.as_ref()
    }
}
