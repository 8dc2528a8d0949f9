//! Diagnostic report uploads and the consolidated per-patient view.
//!
//! An upload is a bundle of at most one file per category. Every part is
//! buffered and validated before anything touches disk, so a rejected upload
//! leaves no files and no bundle behind. Consolidation walks a patient's
//! bundles newest-first and keeps, per category, the first file it sees.

use std::collections::BTreeMap;

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use vitalis_types::api::{ConsolidatedFile, ConsolidatedReport, UploadStat, UploadSummary};
use vitalis_types::models::{FileKind, FileMeta, ReportBundle, ReportCategory, Role};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult, blocking, created, ok};
use crate::extract::Caller;
use crate::files::{IncomingFile, MultipartForm, file_extension};

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];
pub const ALLOWED_PDF_TYPE: &str = "application/pdf";

fn classify(content_type: &str) -> Option<FileKind> {
    if ALLOWED_IMAGE_TYPES.contains(&content_type) {
        Some(FileKind::Image)
    } else if content_type == ALLOWED_PDF_TYPE {
        Some(FileKind::Pdf)
    } else {
        None
    }
}

/// Validates the file parts of an upload and keys them by category.
pub fn collect_report_files(
    files: Vec<IncomingFile>,
) -> ApiResult<BTreeMap<ReportCategory, (FileKind, IncomingFile)>> {
    let mut slots = BTreeMap::new();

    for file in files {
        let category: ReportCategory = file
            .field
            .parse()
            .map_err(|_| ApiError::upload(format!("Unexpected field: {}", file.field)))?;
        let kind = classify(&file.content_type).ok_or_else(|| {
            ApiError::upload(format!(
                "Invalid file type for {}: {}. Only images and PDFs are allowed.",
                category, file.content_type
            ))
        })?;
        if slots.contains_key(&category) {
            return Err(ApiError::upload(format!("Only one file is allowed for {category}")));
        }
        slots.insert(category, (kind, file));
    }

    if slots.is_empty() {
        return Err(ApiError::upload("No files uploaded"));
    }
    Ok(slots)
}

/// Latest file per category across `bundles`, which must be newest-first.
/// `None` when there are no bundles at all.
pub fn consolidate(bundles: &[ReportBundle]) -> Option<ConsolidatedReport> {
    let newest = bundles.first()?;
    let mut files: BTreeMap<ReportCategory, ConsolidatedFile> = BTreeMap::new();

    for bundle in bundles {
        for (category, file) in &bundle.files {
            files.entry(*category).or_insert_with(|| ConsolidatedFile {
                file: file.clone(),
                report_time: bundle.time,
                report_id: bundle.id,
            });
        }
    }

    Some(ConsolidatedReport {
        id: newest.id,
        patient: newest.patient,
        mobile: newest.mobile.clone(),
        time: newest.time,
        has_reports: !files.is_empty(),
        files,
    })
}

fn parse_id(raw: &str, missing: &'static str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::not_found(missing))
}

/// POST /reports/upload/{patient_id}
pub async fn upload(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(patient_id): Path<String>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let patient_id = parse_id(&patient_id, "Patient not found")?;
    let form = MultipartForm::read(multipart).await?;
    let slots = collect_report_files(form.files)?;

    let db = state.clone();
    let patient = blocking(move || {
        db.db
            .get_identity(&patient_id)?
            .filter(|identity| identity.role() == Role::Patient)
            .ok_or_else(|| ApiError::not_found("Patient not found"))
    })
    .await?;

    let report_id = Uuid::new_v4();
    let now = Utc::now();
    let mut written: Vec<String> = Vec::with_capacity(slots.len());
    let mut bundle = ReportBundle {
        id: report_id,
        patient: patient.id,
        mobile: patient.mobile.clone(),
        time: now,
        files: BTreeMap::new(),
    };
    let mut stats = Vec::with_capacity(slots.len());

    for (category, (kind, file)) in &slots {
        let name = format!("{}-{}.{}", report_id, category, file_extension(file));
        let stored = match state.storage.put(&name, &file.data).await {
            Ok(stored) => stored,
            Err(e) => {
                error!("Failed to store {} for report {}: {:#}", category, report_id, e);
                remove_all(&state, &written).await;
                return Err(ApiError::Internal(e));
            }
        };
        written.push(stored.name);

        bundle.files.insert(
            *category,
            FileMeta {
                path: stored.path,
                url: stored.url,
                kind: *kind,
                original_name: file.file_name.clone(),
                size: file.data.len() as u64,
                uploaded_at: now,
            },
        );
        stats.push(UploadStat {
            field: *category,
            kind: *kind,
            filename: file.file_name.clone(),
            size: file.data.len() as u64,
        });
    }

    let db = state.clone();
    let row = bundle.clone();
    if let Err(e) = blocking(move || Ok(db.db.insert_report(&row)?)).await {
        remove_all(&state, &written).await;
        return Err(e);
    }

    info!(
        "Report {} for patient {} uploaded by {} ({} files)",
        report_id,
        patient.id,
        caller.id,
        stats.len()
    );

    Ok(created(UploadSummary {
        message: "Files uploaded successfully!".into(),
        report_id,
        uploaded_files: bundle.files.keys().copied().collect(),
        stats,
    }))
}

async fn remove_all(state: &AppState, names: &[String]) {
    for name in names {
        if let Err(e) = state.storage.delete(name).await {
            warn!("Failed to remove {} after aborted upload: {:#}", name, e);
        }
    }
}

/// GET /reports/{patient_id}: the newest file in every category.
pub async fn consolidated(
    State(state): State<AppState>,
    Caller(_caller): Caller,
    Path(patient_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    const MISSING: &str = "No reports found for this patient";
    let patient_id = parse_id(&patient_id, MISSING)?;

    let db = state.clone();
    let bundles = blocking(move || Ok(db.db.reports_for_patient(&patient_id)?)).await?;
    let report = consolidate(&bundles).ok_or_else(|| ApiError::not_found(MISSING))?;

    Ok(ok(report))
}

/// GET /reports/report/{report_id}: one bundle as uploaded.
pub async fn single(
    State(state): State<AppState>,
    Caller(_caller): Caller,
    Path(report_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    const MISSING: &str = "Report not found";
    let report_id = parse_id(&report_id, MISSING)?;

    let db = state.clone();
    let report = blocking(move || Ok(db.db.get_report(&report_id)?))
        .await?
        .ok_or_else(|| ApiError::not_found(MISSING))?;

    Ok(ok(report))
}
