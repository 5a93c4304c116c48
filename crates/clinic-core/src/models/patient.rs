use serde::{Deserialize, Serialize};

use super::ids;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    #[serde(deserialize_with = "ids::id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    #[serde(deserialize_with = "ids::id")]
    pub id: String,
    #[serde(default)]
    pub personal_photo: Option<String>,
    pub full_name: String,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub clinic: Option<Clinic>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub insurance_info: Option<String>,
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub doctors: Vec<i64>,
}

impl Patient {
    pub fn display_age(&self) -> String {
        match self.age {
            Some(age) => age.to_string(),
            None => "-".to_string(),
        }
    }

    pub fn clinic_name(&self) -> &str {
        self.clinic.as_ref().map(|c| c.name.as_str()).unwrap_or("-")
    }
}

/// Payload for registering a patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub personal_photo: Option<String>,
    pub full_name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub address: String,
    pub phone: String,
    pub insurance_info: String,
    pub contact_info: String,
    pub clinic_id: String,
}
