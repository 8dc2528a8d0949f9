use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted tag does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

// -- Identities --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    Patient,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doctor" => Ok(Role::Doctor),
            "patient" => Ok(Role::Patient),
            other => Err(UnknownVariant { kind: "role", value: other.to_string() }),
        }
    }
}

/// A user account. The role-specific attributes live in `profile`, so a
/// doctor can never carry a doctor reference and a patient always does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub mobile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Profile {
    Doctor {
        hospital: String,
    },
    Patient {
        uhid: String,
        age: u32,
        gender: String,
        /// Owning doctor.
        doctor: Uuid,
    },
}

impl Identity {
    pub fn role(&self) -> Role {
        match self.profile {
            Profile::Doctor { .. } => Role::Doctor,
            Profile::Patient { .. } => Role::Patient,
        }
    }

    /// The owning doctor, for patients.
    pub fn doctor_id(&self) -> Option<Uuid> {
        match self.profile {
            Profile::Patient { doctor, .. } => Some(doctor),
            Profile::Doctor { .. } => None,
        }
    }
}

// -- Vitals --

/// Legacy daily reading, timestamped by when the reading was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReading {
    pub id: Uuid,
    pub patient: Uuid,
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

/// Visit ("drug") record submitted by a doctor or by the patient, timestamped
/// by creation. Absent measurements stay absent; they are never stored as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: Uuid,
    pub patient: Uuid,
    pub mobile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub other_diagnosis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_walk: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_climb: Option<bool>,
    /// Medicine entries exactly as the client sent them.
    #[serde(default)]
    pub medicines: Vec<serde_json::Value>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

// -- Messages --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Audio,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Audio => "audio",
        }
    }
}

impl FromStr for MessageKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "audio" => Ok(MessageKind::Audio),
            other => Err(UnknownVariant { kind: "message kind", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Uuid,
    pub receiver: Uuid,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Stored audio file name, for audio messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Reports --

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    OpdCard,
    Echo,
    Ecg,
    CardiacMri,
    Bnp,
    Biopsy,
    BiochemistryReport,
}

impl ReportCategory {
    pub const ALL: [ReportCategory; 7] = [
        ReportCategory::OpdCard,
        ReportCategory::Echo,
        ReportCategory::Ecg,
        ReportCategory::CardiacMri,
        ReportCategory::Bnp,
        ReportCategory::Biopsy,
        ReportCategory::BiochemistryReport,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportCategory::OpdCard => "opd_card",
            ReportCategory::Echo => "echo",
            ReportCategory::Ecg => "ecg",
            ReportCategory::CardiacMri => "cardiac_mri",
            ReportCategory::Bnp => "bnp",
            ReportCategory::Biopsy => "biopsy",
            ReportCategory::BiochemistryReport => "biochemistry_report",
        }
    }
}

impl fmt::Display for ReportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownVariant { kind: "report category", value: s.to_string() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Pdf,
}

impl FileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Pdf => "pdf",
        }
    }
}

impl FromStr for FileKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(FileKind::Image),
            "pdf" => Ok(FileKind::Pdf),
            other => Err(UnknownVariant { kind: "file kind", value: other.to_string() }),
        }
    }
}

/// Metadata for one stored report file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub path: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub original_name: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// One upload event's files for a patient, at most one per category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBundle {
    pub id: Uuid,
    pub patient: Uuid,
    pub mobile: String,
    pub time: DateTime<Utc>,
    pub files: BTreeMap<ReportCategory, FileMeta>,
}
