use serde::{Deserialize, Serialize};

use super::ids;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    #[serde(deserialize_with = "ids::id")]
    pub id: String,
    /// Id of the appointment this bill belongs to
    #[serde(deserialize_with = "ids::id")]
    pub appointment: String,
    #[serde(default)]
    pub doctor: Option<i64>,
    /// Decimal amount as sent by the backend, e.g. "150.00"
    pub amount: String,
    #[serde(default)]
    pub is_paid: bool,
    pub created_at: String,
    #[serde(default)]
    pub appointment_datetime: Option<String>,
    #[serde(default)]
    pub patient_name: String,
}

impl Bill {
    pub fn status_display(&self) -> &'static str {
        if self.is_paid {
            "Paid"
        } else {
            "Unpaid"
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBill {
    pub appointment: String,
    pub amount: String,
    #[serde(default)]
    pub is_paid: bool,
}
