use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use vitalis_types::api::{PatientSignupRequest, SignupResponse, TokenStatus, VitalsRequest};
use vitalis_types::models::{Identity, Profile, Role};

use crate::auth::{AppState, register};
use crate::error::{ApiError, ApiResult, blocking, created, ok, required};
use crate::extract::{Patient, Payload};
use crate::vitals::record_visit;

/// POST /patient/signup: self-registration; the owning doctor is resolved
/// from `doctor_mobile`.
pub async fn signup(
    State(state): State<AppState>,
    Payload(req): Payload<PatientSignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let (
        Some(name),
        Some(mobile),
        Some(password),
        Some(uhid),
        Some(age),
        Some(gender),
        Some(doctor_mobile),
    ) = (
        required(req.name),
        required(req.mobile),
        req.password.filter(|p| !p.is_empty()),
        required(req.uhid),
        req.age,
        required(req.gender),
        required(req.doctor_mobile),
    )
    else {
        return Err(ApiError::validation(
            "Missing required fields: name, mobile, password, uhid, age, gender, doctor_mobile",
        ));
    };
    let age = age
        .to_age()
        .ok_or_else(|| ApiError::validation("age must be a whole number"))?;
    let email = required(req.email);

    let db = state.clone();
    let patient = blocking(move || {
        if db.db.get_user_by_mobile(&mobile)?.is_some() {
            return Err(ApiError::Conflict("A user with this mobile number already exists".into()));
        }
        let doctor = db
            .db
            .find_by_mobile(&doctor_mobile, Role::Doctor)?
            .ok_or_else(|| ApiError::not_found("Such doctor doesn't exist"))?;

        let identity = Identity {
            id: Uuid::new_v4(),
            name,
            mobile,
            email,
            created_at: Utc::now(),
            profile: Profile::Patient {
                uhid,
                age,
                gender,
                doctor: doctor.id,
            },
        };
        register(&db.db, identity, &password)
    })
    .await?;

    Ok(created(SignupResponse {
        message: "User created successfully. You may log in.".into(),
        user_id: patient.id,
    }))
}

/// POST /patient/add: the caller records their own vitals. Any `mobile` in
/// the body is ignored.
pub async fn add_visit(
    State(state): State<AppState>,
    Patient(patient): Patient,
    Payload(req): Payload<VitalsRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let visit = blocking(move || record_visit(&db.db, &patient, patient.id, req)).await?;
    Ok(created(visit))
}

/// POST /patient/get-daily-data: the caller's visit history, newest first.
pub async fn history(
    State(state): State<AppState>,
    Patient(patient): Patient,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let visits = blocking(move || Ok(db.db.visits_by_mobile(&patient.mobile)?)).await?;
    Ok(ok(visits))
}

/// POST /patient/validate-token: reaching the handler means the token is live.
pub async fn validate_token(Patient(_patient): Patient) -> ApiResult<impl IntoResponse> {
    Ok(ok(TokenStatus {
        status: "valid".into(),
    }))
}
