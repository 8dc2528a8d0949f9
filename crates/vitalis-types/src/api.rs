use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FileKind, FileMeta, Identity, Message, ReportCategory, Role, VisitRecord};

// -- Envelope --

/// Success body shared by every route: `{"ok": true, "data": ...}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    Upload,
    Conflict,
    Internal,
}

/// Failure body shared by every route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: ErrorKind,
    pub message: String,
}

// -- JWT Claims --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize,
}

// -- Loose inputs --

/// A number as mobile/web clients send it: either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    /// Interprets the input as an optional measurement. A zero number or a
    /// blank string reads as "not provided"; anything else must parse.
    pub fn to_measurement(&self) -> Result<Option<f64>, String> {
        match self {
            NumberInput::Number(n) if *n == 0.0 => Ok(None),
            NumberInput::Number(n) if n.is_finite() => Ok(Some(*n)),
            NumberInput::Number(n) => Err(n.to_string()),
            NumberInput::Text(s) if s.trim().is_empty() => Ok(None),
            NumberInput::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Some)
                .ok_or_else(|| s.clone()),
        }
    }

    /// Interprets the input as a whole number of years.
    pub fn to_age(&self) -> Option<u32> {
        let value = match self {
            NumberInput::Number(n) => *n,
            NumberInput::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
            Some(value as u32)
        } else {
            None
        }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub mobile: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub role: Role,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub name: String,
    pub mobile: String,
}

/// Caller profile; patients get their doctor's summary attached.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_details: Option<DoctorSummary>,
}

// -- Registration --

#[derive(Debug, Deserialize)]
pub struct DoctorSignupRequest {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub hospital: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddPatientRequest {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub password: Option<String>,
    pub uhid: Option<String>,
    pub email: Option<String>,
    pub age: Option<NumberInput>,
    pub gender: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PatientSignupRequest {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub password: Option<String>,
    pub uhid: Option<String>,
    pub email: Option<String>,
    pub age: Option<NumberInput>,
    pub gender: Option<String>,
    pub doctor_mobile: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub message: String,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatientCreated {
    pub message: String,
    pub patient: Identity,
}

// -- Doctor views --

#[derive(Debug, Serialize, Deserialize)]
pub struct DoctorOverview {
    pub name: String,
    pub hospital: String,
    pub patient_count: usize,
}

/// Chart-ready vitals: parallel arrays indexed by chronological position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalsSeries {
    pub sbp: Vec<f64>,
    pub dbp: Vec<f64>,
    pub weight: Vec<f64>,
    pub time: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RosterEntry {
    pub patient: Identity,
    pub graph_data: VitalsSeries,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PatientInfo {
    pub name: String,
    pub uhid: String,
    pub age: String,
    pub gender: String,
    pub mobile: String,
    pub doctor_mobile: String,
    pub disease: String,
}

// -- Vitals --

#[derive(Debug, Default, Deserialize)]
pub struct VitalsRequest {
    /// Patient mobile; only read when a doctor submits.
    pub mobile: Option<String>,
    pub diagnosis: Option<String>,
    #[serde(alias = "otherDiagnosis")]
    pub other_diagnosis: Option<String>,
    pub weight: Option<NumberInput>,
    pub sbp: Option<NumberInput>,
    pub dbp: Option<NumberInput>,
    pub status: Option<String>,
    pub can_walk: Option<bool>,
    pub can_climb: Option<bool>,
    pub medicines: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VisitCreated {
    pub message: String,
    pub record: VisitRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenStatus {
    pub status: String,
}

// -- Chat --

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    pub receiver_id: Uuid,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationRequest {
    pub receiver_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub mine: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AudioUploaded {
    pub message: String,
    pub file_path: String,
}

// -- Reports --

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadStat {
    pub field: ReportCategory,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadSummary {
    pub message: String,
    pub report_id: Uuid,
    pub uploaded_files: Vec<ReportCategory>,
    pub stats: Vec<UploadStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedFile {
    #[serde(flatten)]
    pub file: FileMeta,
    pub report_time: DateTime<Utc>,
    pub report_id: Uuid,
}

/// Newest file per category across every bundle of a patient. The
/// envelope fields (`id`, `mobile`, `time`) come from the newest bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedReport {
    pub id: Uuid,
    pub patient: Uuid,
    pub mobile: String,
    pub time: DateTime<Utc>,
    pub files: BTreeMap<ReportCategory, ConsolidatedFile>,
    pub has_reports: bool,
}

// -- Voice form --

#[derive(Debug, Deserialize)]
pub struct VoiceFormRequest {
    #[serde(default)]
    pub voice_text: String,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceForm {
    pub name: String,
    pub mobile: String,
    pub gender: String,
}
