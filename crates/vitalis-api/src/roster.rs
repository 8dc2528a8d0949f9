//! Doctor roster: every patient of the calling doctor, each annotated with a
//! chart-ready vitals series merged from legacy daily readings and visit
//! records.
//!
//! The series is ordered by the source timestamp (reading time for legacy
//! readings, creation time for visits). The sort is stable, so readings that
//! share a timestamp keep scan order: legacy readings first, then visits. The
//! x-axis is the ordinal position after sorting, not elapsed time, and absent
//! measurements are charted as 0 so every array stays the same length.

use axum::{extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use tracing::debug;

use vitalis_types::api::{RosterEntry, VitalsSeries};
use vitalis_types::models::{DailyReading, VisitRecord};

use crate::auth::AppState;
use crate::error::{ApiResult, blocking, ok};
use crate::extract::Doctor;

#[derive(Debug, Clone, Copy)]
struct Point {
    timestamp: DateTime<Utc>,
    sbp: f64,
    dbp: f64,
    weight: f64,
}

/// Merges both vitals sources into one chronological series.
pub fn merge_vitals(readings: &[DailyReading], visits: &[VisitRecord]) -> VitalsSeries {
    let mut points: Vec<Point> = readings
        .iter()
        .map(|r| Point {
            timestamp: r.time,
            sbp: r.sbp.unwrap_or(0.0),
            dbp: r.dbp.unwrap_or(0.0),
            weight: r.weight.unwrap_or(0.0),
        })
        .chain(visits.iter().map(|v| Point {
            timestamp: v.created_at,
            sbp: v.sbp.unwrap_or(0.0),
            dbp: v.dbp.unwrap_or(0.0),
            weight: v.weight.unwrap_or(0.0),
        }))
        .collect();

    // Stable: equal timestamps keep scan order
    points.sort_by_key(|p| p.timestamp);

    let mut series = VitalsSeries::default();
    for (index, point) in points.iter().enumerate() {
        series.sbp.push(point.sbp);
        series.dbp.push(point.dbp);
        series.weight.push(point.weight);
        series.time.push(index);
    }
    series
}

/// POST /doctor/allpatient
///
/// Any store failure fails the whole roster; partial rosters are never returned.
pub async fn all_patients(
    State(state): State<AppState>,
    Doctor(doctor): Doctor,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let doctor_id = doctor.id;

    let roster = blocking(move || {
        let patients = db.db.patients_of(&doctor_id)?;
        let mut roster = Vec::with_capacity(patients.len());
        for patient in patients {
            let readings = db.db.daily_readings_for(&patient.id)?;
            let visits = db.db.visits_for(&patient.id)?;
            roster.push(RosterEntry {
                graph_data: merge_vitals(&readings, &visits),
                patient,
            });
        }
        Ok(roster)
    })
    .await?;

    debug!("Roster for doctor {}: {} patients", doctor_id, roster.len());
    Ok(ok(roster))
}
