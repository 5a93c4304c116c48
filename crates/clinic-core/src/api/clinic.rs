//! Typed endpoints for the clinic resources.
//!
//! Thin wrappers mapping each resource onto `ApiClient::request` (or
//! `post_multipart` for image uploads); all auth and refresh handling lives
//! in the generic transport.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::models::{
    Appointment, Bill, Diagnosis, NewAppointment, NewBill, NewPatient, NewTreatment, Patient,
    Treatment, UserProfile,
};

use super::{ApiClient, ApiError};

const PROFILE_PATH: &str = "/api/users/profile/";
const PATIENTS_PATH: &str = "/api/users/users/patients/";
const APPOINTMENTS_PATH: &str = "/api/users/users/appointment/";
const BILLS_PATH: &str = "/api/users/users/bills/";
const DIAGNOSES_PATH: &str = "/api/users/users/diagnoses/";
const DIAGNOSIS_ITEM_PREFIX: &str = "/api/diagnoses/";
const NEW_DIAGNOSIS_PATH: &str = "/api/diagnoses/";
const TREATMENTS_PATH: &str = "/api/users/users/treatments/";

/// Reject ids that would escape their resource path
fn item_path(prefix: &str, id: &str) -> Result<String, ApiError> {
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(ApiError::InvalidRequest(format!("invalid id: {:?}", id)));
    }
    Ok(format!("{}{}/", prefix, id))
}

/// A fundus image read into memory, ready to attach to each attempt.
#[derive(Debug, Clone)]
struct Image {
    file_name: String,
    mime: &'static str,
    bytes: Vec<u8>,
}

impl Image {
    async fn read(path: &Path) -> Result<Self, ApiError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ApiError::InvalidRequest(format!("cannot read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self {
            file_name,
            mime: image_mime(path),
            bytes,
        })
    }

    fn part(&self) -> Result<Part, ApiError> {
        Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(self.mime)
            .map_err(|e| ApiError::InvalidRequest(format!("{}: {}", self.file_name, e)))
    }
}

fn image_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

fn diagnosis_form(
    patient_id: &str,
    left: Option<&Image>,
    right: Option<&Image>,
) -> Result<Form, ApiError> {
    let mut form = Form::new().text("patient_id", patient_id.to_string());
    if let Some(image) = left {
        form = form.part("left_fundus_image", image.part()?);
    }
    if let Some(image) = right {
        form = form.part("right_fundus_image", image.part()?);
    }
    Ok(form)
}

impl ApiClient {
    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.get(PROFILE_PATH).await
    }

    pub async fn fetch_patients(&self) -> Result<Vec<Patient>, ApiError> {
        self.get(PATIENTS_PATH).await
    }

    pub async fn add_patient(&self, patient: &NewPatient) -> Result<Patient, ApiError> {
        self.post(PATIENTS_PATH, patient).await
    }

    pub async fn fetch_appointments(&self) -> Result<Vec<Appointment>, ApiError> {
        self.get(APPOINTMENTS_PATH).await
    }

    pub async fn add_appointment(&self, appointment: &NewAppointment) -> Result<Value, ApiError> {
        self.post(APPOINTMENTS_PATH, appointment).await
    }

    pub async fn delete_appointment(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&item_path(APPOINTMENTS_PATH, id)?).await
    }

    pub async fn fetch_bills(&self) -> Result<Vec<Bill>, ApiError> {
        self.get(BILLS_PATH).await
    }

    pub async fn add_bill(&self, bill: &NewBill) -> Result<Value, ApiError> {
        self.post(BILLS_PATH, bill).await
    }

    pub async fn fetch_diagnoses(&self) -> Result<Vec<Diagnosis>, ApiError> {
        self.get(DIAGNOSES_PATH).await
    }

    /// Upload fundus images for a patient and start a diagnosis.
    ///
    /// Either image may be omitted. Files are read once up front; the form
    /// is rebuilt from them if the upload has to be retried after a refresh.
    pub async fn new_diagnosis(
        &self,
        patient_id: &str,
        left: Option<&Path>,
        right: Option<&Path>,
    ) -> Result<Value, ApiError> {
        if patient_id.trim().is_empty() {
            return Err(ApiError::InvalidRequest("patient id is required".into()));
        }
        let left = match left {
            Some(path) => Some(Image::read(path).await?),
            None => None,
        };
        let right = match right {
            Some(path) => Some(Image::read(path).await?),
            None => None,
        };

        let build = || diagnosis_form(patient_id, left.as_ref(), right.as_ref());
        self.post_multipart(NEW_DIAGNOSIS_PATH, &build).await
    }

    pub async fn delete_diagnosis(&self, id: &str) -> Result<(), ApiError> {
        self.delete(&item_path(DIAGNOSIS_ITEM_PREFIX, id)?).await
    }

    pub async fn fetch_treatments(&self) -> Result<Vec<Treatment>, ApiError> {
        self.get(TREATMENTS_PATH).await
    }

    pub async fn add_treatment(&self, treatment: &NewTreatment) -> Result<Value, ApiError> {
        self.post(TREATMENTS_PATH, treatment).await
    }
}
