use serde::{Deserialize, Serialize};

use super::ids;
use crate::utils::month_key;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    #[serde(deserialize_with = "ids::id")]
    pub id: String,
    #[serde(deserialize_with = "ids::id")]
    pub patient: String,
    pub appointment_datetime: String,
    #[serde(default)]
    pub doctor: Option<i64>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Appointment {
    /// `YYYY-MM` of the appointment, if the datetime parses
    pub fn month(&self) -> Option<String> {
        month_key(&self.appointment_datetime)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub appointment_datetime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
