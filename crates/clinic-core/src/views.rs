//! Display rows assembled from independently fetched resource lists.
//!
//! The backend returns flat lists; bills point at appointments, diagnoses at
//! patients, treatments at diagnoses. These joins run client-side.

use crate::models::{
    Appointment, Bill, ConfidenceMap, Diagnosis, DiagnosisStatus, Patient, Treatment,
};
use crate::utils::{contains_ignore_case, datetime_sort_key};

/// Shown when a confidence map is missing or empty
pub const NO_LABEL: &str = "-";

/// Anything with a patient name that list views filter on.
pub trait PatientNamed {
    fn patient_name(&self) -> &str;
}

impl PatientNamed for Patient {
    fn patient_name(&self) -> &str {
        &self.full_name
    }
}

impl PatientNamed for Bill {
    fn patient_name(&self) -> &str {
        &self.patient_name
    }
}

impl PatientNamed for Treatment {
    fn patient_name(&self) -> &str {
        &self.patient_name
    }
}

impl PatientNamed for Appointment {
    fn patient_name(&self) -> &str {
        &self.patient_name
    }
}

/// Keep items whose patient name contains `search`, ignoring case
pub fn filter_by_name<'a, T: PatientNamed>(items: &'a [T], search: &str) -> Vec<&'a T> {
    items
        .iter()
        .filter(|item| contains_ignore_case(item.patient_name(), search))
        .collect()
}

/// Label with the highest confidence. Ties go to the key that came first
/// in the response.
pub fn max_confidence_label(scores: &ConfidenceMap) -> Option<&str> {
    let mut best: Option<(&str, f64)> = None;
    for (label, &score) in scores {
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((label.as_str(), score)),
        }
    }
    best.map(|(label, _)| label)
}

fn label_or_dash(scores: Option<&ConfidenceMap>) -> String {
    scores
        .and_then(max_confidence_label)
        .unwrap_or(NO_LABEL)
        .to_string()
}

#[derive(Debug, Clone)]
pub struct AppointmentRow<'a> {
    pub appointment: &'a Appointment,
    pub bill: Option<&'a Bill>,
}

/// Appointments in `month` (`YYYY-MM`) matching `search`, earliest first,
/// each paired with its bill if one exists.
pub fn appointment_rows<'a>(
    appointments: &'a [Appointment],
    bills: &'a [Bill],
    month: Option<&str>,
    search: &str,
) -> Vec<AppointmentRow<'a>> {
    let mut rows: Vec<AppointmentRow<'a>> = appointments
        .iter()
        .filter(|a| month.map_or(true, |m| a.month().as_deref() == Some(m)))
        .filter(|a| contains_ignore_case(&a.patient_name, search))
        .map(|appointment| AppointmentRow {
            appointment,
            bill: bills.iter().find(|b| b.appointment == appointment.id),
        })
        .collect();

    rows.sort_by_key(|row| datetime_sort_key(&row.appointment.appointment_datetime));
    rows
}

#[derive(Debug, Clone)]
pub struct DiagnosisRow<'a> {
    pub diagnosis: &'a Diagnosis,
    pub patient: Option<&'a Patient>,
    pub patient_name: String,
    pub left_label: String,
    pub right_label: String,
    pub treatment: Option<&'a Treatment>,
}

impl DiagnosisRow<'_> {
    pub fn patient_age(&self) -> Option<u32> {
        self.patient.and_then(|p| p.age)
    }
}

/// Successful diagnoses joined with their patient and treatment, filtered
/// by patient name.
pub fn diagnosis_rows<'a>(
    diagnoses: &'a [Diagnosis],
    patients: &'a [Patient],
    treatments: &'a [Treatment],
    search: &str,
) -> Vec<DiagnosisRow<'a>> {
    diagnoses
        .iter()
        .filter(|d| d.status == DiagnosisStatus::Success)
        .map(|diagnosis| {
            let patient = patients.iter().find(|p| p.id == diagnosis.patient);
            let evidence = diagnosis.evidence();
            DiagnosisRow {
                diagnosis,
                patient,
                patient_name: patient
                    .map(|p| p.full_name.clone())
                    .unwrap_or_else(|| format!("ID: {}", diagnosis.patient)),
                left_label: label_or_dash(evidence.and_then(|e| e.left_fundus_diagnose.as_ref())),
                right_label: label_or_dash(evidence.and_then(|e| e.right_fundus_diagnose.as_ref())),
                treatment: treatments.iter().find(|t| t.diagnosis == diagnosis.id),
            }
        })
        .filter(|row| contains_ignore_case(&row.patient_name, search))
        .collect()
}
