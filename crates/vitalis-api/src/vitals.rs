use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use vitalis_db::Database;
use vitalis_types::api::{NumberInput, VisitCreated, VitalsRequest};
use vitalis_types::models::{Identity, VisitRecord};

use crate::error::{ApiError, ApiResult};

fn measurement(field: &str, input: Option<&NumberInput>) -> ApiResult<Option<f64>> {
    match input {
        None => Ok(None),
        Some(value) => value
            .to_measurement()
            .map_err(|raw| ApiError::validation(format!("{field} must be a number, got '{raw}'"))),
    }
}

/// Builds a visit record for `patient`. Measurements that were not supplied
/// stay `None` in storage.
pub(crate) fn build_visit(patient: &Identity, created_by: Uuid, req: VitalsRequest) -> ApiResult<VisitRecord> {
    Ok(VisitRecord {
        id: Uuid::new_v4(),
        patient: patient.id,
        mobile: patient.mobile.clone(),
        weight: measurement("weight", req.weight.as_ref())?,
        sbp: measurement("sbp", req.sbp.as_ref())?,
        dbp: measurement("dbp", req.dbp.as_ref())?,
        diagnosis: req.diagnosis,
        other_diagnosis: req.other_diagnosis.unwrap_or_default(),
        status: req.status,
        can_walk: req.can_walk,
        can_climb: req.can_climb,
        medicines: req.medicines.unwrap_or_default(),
        created_by,
        created_at: Utc::now(),
    })
}

/// Appends a visit record. Concurrent submissions are independent appends.
pub(crate) fn record_visit(
    db: &Database,
    patient: &Identity,
    created_by: Uuid,
    req: VitalsRequest,
) -> ApiResult<VisitCreated> {
    let record = build_visit(patient, created_by, req)?;
    db.insert_visit(&record)?;
    info!("Visit {} recorded for patient {} by {}", record.id, patient.id, created_by);

    Ok(VisitCreated {
        message: "Patient drug data added successfully".into(),
        record,
    })
}
