use serde::{Deserialize, Serialize};

use super::ids;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    #[serde(deserialize_with = "ids::id")]
    pub id: String,
    /// Id of the diagnosis this treatment answers
    #[serde(deserialize_with = "ids::id")]
    pub diagnosis: String,
    #[serde(default)]
    pub doctor: Option<i64>,
    #[serde(default)]
    pub medication: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub surgical_interventions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTreatment {
    pub diagnosis: String,
    pub medication: String,
    pub dosage: String,
    pub instructions: String,
    pub surgical_interventions: String,
}
