use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use vitalis_types::api::{
    AddPatientRequest, DoctorOverview, DoctorSignupRequest, PatientCreated, PatientInfo,
    SignupResponse, VitalsRequest,
};
use vitalis_types::models::{Identity, Profile, Role};

use crate::auth::{AppState, register};
use crate::error::{ApiError, ApiResult, blocking, created, ok, required};
use crate::extract::{Doctor, Payload};
use crate::vitals::record_visit;

/// Shortest mobile number accepted when looking up history.
const MIN_MOBILE_LEN: usize = 10;

/// POST /doctor/signup
pub async fn signup(
    State(state): State<AppState>,
    Payload(req): Payload<DoctorSignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(name), Some(mobile), Some(password), Some(hospital)) = (
        required(req.name),
        required(req.mobile),
        req.password.filter(|p| !p.is_empty()),
        required(req.hospital),
    ) else {
        return Err(ApiError::validation("Missing required fields: name, mobile, password, hospital"));
    };

    let identity = Identity {
        id: Uuid::new_v4(),
        name,
        mobile,
        email: required(req.email),
        created_at: Utc::now(),
        profile: Profile::Doctor { hospital },
    };

    let db = state.clone();
    let doctor = blocking(move || register(&db.db, identity, &password)).await?;

    Ok(created(SignupResponse {
        message: "User created successfully. You may log in.".into(),
        user_id: doctor.id,
    }))
}

/// POST /doctor/addpatient: registers a patient owned by the calling doctor.
pub async fn add_patient(
    State(state): State<AppState>,
    Doctor(doctor): Doctor,
    Payload(req): Payload<AddPatientRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(name), Some(mobile), Some(password), Some(uhid), Some(age), Some(gender)) = (
        required(req.name),
        required(req.mobile),
        req.password.filter(|p| !p.is_empty()),
        required(req.uhid),
        req.age,
        required(req.gender),
    ) else {
        return Err(ApiError::validation(
            "Missing required fields: name, mobile, password, uhid, age, gender",
        ));
    };
    let age = age
        .to_age()
        .ok_or_else(|| ApiError::validation("age must be a whole number"))?;

    let identity = Identity {
        id: Uuid::new_v4(),
        name,
        mobile,
        email: required(req.email),
        created_at: Utc::now(),
        profile: Profile::Patient {
            uhid,
            age,
            gender,
            doctor: doctor.id,
        },
    };

    let db = state.clone();
    let patient = blocking(move || register(&db.db, identity, &password)).await?;

    Ok(created(PatientCreated {
        message: "Patient added successfully".into(),
        patient,
    }))
}

/// POST /doctor/get-details: name, hospital and patient count.
pub async fn overview(
    State(state): State<AppState>,
    Doctor(doctor): Doctor,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let doctor_id = doctor.id;
    let patient_count = blocking(move || Ok(db.db.count_patients_of(&doctor_id)?)).await?;

    let hospital = match doctor.profile {
        Profile::Doctor { hospital } => hospital,
        Profile::Patient { .. } => String::new(),
    };

    Ok(ok(DoctorOverview {
        name: doctor.name,
        hospital,
        patient_count,
    }))
}

// TODO: require `patient.doctor == caller` here, in getinfo and in patient-drug-data
// before exposing them beyond the care team.
/// POST /doctor/adddrugpatient: vitals for a patient located by mobile.
pub async fn add_visit(
    State(state): State<AppState>,
    Doctor(doctor): Doctor,
    Payload(req): Payload<VitalsRequest>,
) -> ApiResult<impl IntoResponse> {
    let Some(mobile) = required(req.mobile.clone()) else {
        return Err(ApiError::validation("Patient mobile is required"));
    };

    let db = state.clone();
    let created_by = doctor.id;
    let visit = blocking(move || {
        let patient = db
            .db
            .find_by_mobile(&mobile, Role::Patient)?
            .ok_or_else(|| ApiError::not_found("Patient not found"))?;
        record_visit(&db.db, &patient, created_by, req)
    })
    .await?;

    Ok(created(visit))
}

/// POST /doctor/getinfo/{mobile}: patient summary with the owning doctor's
/// mobile and the diagnosis from the newest visit.
pub async fn patient_info(
    State(state): State<AppState>,
    Doctor(_doctor): Doctor,
    Path(mobile): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let info = blocking(move || {
        let patient = db
            .db
            .find_by_mobile(&mobile, Role::Patient)?
            .ok_or_else(|| ApiError::not_found("Patient not found"))?;
        let Profile::Patient {
            uhid,
            age,
            gender,
            doctor,
        } = &patient.profile
        else {
            return Err(ApiError::not_found("Patient not found"));
        };

        let owner = db
            .db
            .get_identity(doctor)?
            .ok_or_else(|| ApiError::not_found("Doctor information not found"))?;
        let disease = db
            .db
            .latest_visit_for(&patient.id)?
            .and_then(|v| v.diagnosis)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "N/A".into());

        Ok(PatientInfo {
            name: patient.name.clone(),
            uhid: uhid.clone(),
            age: format!("{age} years"),
            gender: if gender.is_empty() { "N/A".into() } else { gender.clone() },
            mobile: patient.mobile.clone(),
            doctor_mobile: owner.mobile,
            disease,
        })
    })
    .await?;

    Ok(ok(info))
}

/// POST /doctor/patient-drug-data/mobile/{mobile}: visit history, newest first.
pub async fn visit_history(
    State(state): State<AppState>,
    Doctor(doctor): Doctor,
    Path(mobile): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let mobile = mobile.trim().to_string();
    if mobile.len() < MIN_MOBILE_LEN {
        return Err(ApiError::validation("Invalid mobile number format"));
    }

    let db = state.clone();
    let lookup = mobile.clone();
    let visits = blocking(move || Ok(db.db.visits_by_mobile(&lookup)?)).await?;
    debug!("Doctor {} read {} visit records for {}", doctor.id, visits.len(), mobile);

    Ok(ok(visits))
}
