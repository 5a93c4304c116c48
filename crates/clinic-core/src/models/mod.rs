//! Data models for clinic entities.
//!
//! This module contains the structures exchanged with the backend:
//!
//! - `Patient`, `Clinic`: patient records
//! - `Appointment`, `Bill`: scheduling and billing, joined by appointment id
//! - `Diagnosis`: fundus-image diagnosis results with per-label confidences
//! - `Treatment`: prescriptions attached to a diagnosis
//! - `UserProfile` and the login/signup payloads

pub mod appointment;
pub mod bill;
pub mod diagnosis;
mod ids;
pub mod patient;
pub mod treatment;
pub mod user;

pub use appointment::{Appointment, NewAppointment};
pub use bill::{Bill, NewBill};
pub use diagnosis::{ConfidenceMap, Diagnosis, DiagnosisResult, DiagnosisStatus, EvidenceVector};
pub use patient::{Clinic, NewPatient, Patient};
pub use treatment::{NewTreatment, Treatment};
pub use user::{LoginRequest, LoginResponse, SignupRequest, UserProfile};
