use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Row, params};
use uuid::Uuid;

use vitalis_types::models::{
    DailyReading, FileMeta, Identity, Message, Profile, ReportBundle, ReportCategory, Role,
    VisitRecord,
};

use crate::models::{NewUser, UserRow};
use crate::{Database, DbError, Result};

const USER_COLUMNS: &str =
    "id, mobile, password, role, name, email, hospital, uhid, age, gender, doctor_id, created_at";

const VISIT_COLUMNS: &str = "id, patient_id, mobile, diagnosis, other_diagnosis, weight, sbp, dbp, \
     status, can_walk, can_climb, medicines, created_by, created_at";

impl Database {
    // -- Users --

    /// Inserts a new identity. A duplicate mobile (or uhid) surfaces as
    /// `DbError::Conflict`, whether or not a caller pre-checked it.
    pub fn create_user(&self, user: &NewUser) -> Result<()> {
        let identity = &user.identity;
        let (hospital, uhid, age, gender, doctor_id) = match &identity.profile {
            Profile::Doctor { hospital } => (Some(hospital.as_str()), None, None, None, None),
            Profile::Patient {
                uhid,
                age,
                gender,
                doctor,
            } => (None, Some(uhid.as_str()), Some(*age), Some(gender.as_str()), Some(*doctor)),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, mobile, password, role, name, email, hospital, uhid, age, gender, doctor_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    identity.id,
                    identity.mobile,
                    user.password_hash,
                    identity.role().as_str(),
                    identity.name,
                    identity.email,
                    hospital,
                    uhid,
                    age,
                    gender,
                    doctor_id,
                    identity.created_at,
                ],
            )
            .map_err(unique_violation)?;
            Ok(())
        })
    }

    pub fn get_user_by_mobile(&self, mobile: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE mobile = ?1");
            conn.query_row(&sql, [mobile], user_from_row).optional()
        })
    }

    pub fn get_user_by_id(&self, id: &Uuid) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
            conn.query_row(&sql, [id], user_from_row).optional()
        })
    }

    pub fn get_identity(&self, id: &Uuid) -> Result<Option<Identity>> {
        self.get_user_by_id(id)?.map(UserRow::into_identity).transpose()
    }

    /// Looks up an identity by mobile, only if it has the given role.
    pub fn find_by_mobile(&self, mobile: &str, role: Role) -> Result<Option<Identity>> {
        match self.get_user_by_mobile(mobile)? {
            Some(row) if row.role == role => row.into_identity().map(Some),
            _ => Ok(None),
        }
    }

    /// Patients assigned to a doctor, in registration order.
    pub fn patients_of(&self, doctor_id: &Uuid) -> Result<Vec<Identity>> {
        let rows = self.with_conn(|conn| {
            let sql = format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE role = 'patient' AND doctor_id = ?1
                 ORDER BY created_at, rowid"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([doctor_id], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter().map(UserRow::into_identity).collect()
    }

    pub fn count_patients_of(&self, doctor_id: &Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'patient' AND doctor_id = ?1",
                [doctor_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }

    // -- Vitals --

    pub fn insert_daily_reading(&self, reading: &DailyReading) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO daily_readings (id, patient_id, time, sbp, dbp, weight)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    reading.id,
                    reading.patient,
                    reading.time,
                    reading.sbp,
                    reading.dbp,
                    reading.weight,
                ],
            )?;
            Ok(())
        })
    }

    /// Legacy readings for a patient in store order.
    pub fn daily_readings_for(&self, patient_id: &Uuid) -> Result<Vec<DailyReading>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, patient_id, time, sbp, dbp, weight
                 FROM daily_readings WHERE patient_id = ?1 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map([patient_id], |row| {
                    Ok(DailyReading {
                        id: row.get(0)?,
                        patient: row.get(1)?,
                        time: row.get(2)?,
                        sbp: row.get(3)?,
                        dbp: row.get(4)?,
                        weight: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_visit(&self, visit: &VisitRecord) -> Result<()> {
        let medicines = serde_json::Value::Array(visit.medicines.clone());
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO visit_records (id, patient_id, mobile, diagnosis, other_diagnosis, weight, sbp, dbp,
                                            status, can_walk, can_climb, medicines, created_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    visit.id,
                    visit.patient,
                    visit.mobile,
                    visit.diagnosis,
                    visit.other_diagnosis,
                    visit.weight,
                    visit.sbp,
                    visit.dbp,
                    visit.status,
                    visit.can_walk,
                    visit.can_climb,
                    medicines,
                    visit.created_by,
                    visit.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Visit records for a patient in store order.
    pub fn visits_for(&self, patient_id: &Uuid) -> Result<Vec<VisitRecord>> {
        self.with_conn(|conn| {
            let sql =
                format!("SELECT {VISIT_COLUMNS} FROM visit_records WHERE patient_id = ?1 ORDER BY rowid");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([patient_id], visit_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Visit records filed under a mobile number, newest first.
    pub fn visits_by_mobile(&self, mobile: &str) -> Result<Vec<VisitRecord>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {VISIT_COLUMNS} FROM visit_records WHERE mobile = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([mobile], visit_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn latest_visit_for(&self, patient_id: &Uuid) -> Result<Option<VisitRecord>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {VISIT_COLUMNS} FROM visit_records WHERE patient_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            );
            conn.query_row(&sql, [patient_id], visit_from_row).optional()
        })
    }

    // -- Messages --

    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, kind, text, filename, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    message.id,
                    message.sender,
                    message.receiver,
                    message.kind.as_str(),
                    message.text,
                    message.filename,
                    message.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Every message exchanged between `a` and `b`, in either direction,
    /// oldest first. Messages stamped within the same instant keep insertion order.
    pub fn conversation(&self, a: &Uuid, b: &Uuid) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, kind, text, filename, created_at
                 FROM messages
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map(params![a, b], |row| {
                    Ok(Message {
                        id: row.get(0)?,
                        sender: row.get(1)?,
                        receiver: row.get(2)?,
                        kind: parse_column(row, 3)?,
                        text: row.get(4)?,
                        filename: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Reports --

    /// Inserts a bundle and all of its file slots atomically.
    pub fn insert_report(&self, report: &ReportBundle) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO reports (id, patient_id, mobile, time) VALUES (?1, ?2, ?3, ?4)",
                params![report.id, report.patient, report.mobile, report.time],
            )?;
            for (category, file) in &report.files {
                tx.execute(
                    "INSERT INTO report_files (report_id, category, path, url, kind, original_name, size, uploaded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        report.id,
                        category.as_str(),
                        file.path,
                        file.url,
                        file.kind.as_str(),
                        file.original_name,
                        file.size as i64,
                        file.uploaded_at,
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// All bundles for a patient, newest first.
    pub fn reports_for_patient(&self, patient_id: &Uuid) -> Result<Vec<ReportBundle>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, patient_id, mobile, time FROM reports
                 WHERE patient_id = ?1 ORDER BY time DESC, rowid DESC",
            )?;
            let mut reports = stmt
                .query_map([patient_id], report_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // One pass over every file of the patient instead of one query per bundle
            let mut stmt = conn.prepare(
                "SELECT f.report_id, f.category, f.path, f.url, f.kind, f.original_name, f.size, f.uploaded_at
                 FROM report_files f
                 JOIN reports r ON r.id = f.report_id
                 WHERE r.patient_id = ?1",
            )?;
            let mut files: HashMap<Uuid, BTreeMap<ReportCategory, FileMeta>> = HashMap::new();
            let rows = stmt.query_map([patient_id], file_from_row)?;
            for row in rows {
                let (report_id, category, meta) = row?;
                files.entry(report_id).or_default().insert(category, meta);
            }

            for report in &mut reports {
                report.files = files.remove(&report.id).unwrap_or_default();
            }
            Ok(reports)
        })
    }

    pub fn get_report(&self, id: &Uuid) -> Result<Option<ReportBundle>> {
        self.with_conn(|conn| {
            let Some(mut report) = conn
                .query_row(
                    "SELECT id, patient_id, mobile, time FROM reports WHERE id = ?1",
                    [id],
                    report_from_row,
                )
                .optional()?
            else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT report_id, category, path, url, kind, original_name, size, uploaded_at
                 FROM report_files WHERE report_id = ?1",
            )?;
            for row in stmt.query_map([id], file_from_row)? {
                let (_, category, meta) = row?;
                report.files.insert(category, meta);
            }
            Ok(Some(report))
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        mobile: row.get(1)?,
        password: row.get(2)?,
        role: parse_column(row, 3)?,
        name: row.get(4)?,
        email: row.get(5)?,
        hospital: row.get(6)?,
        uhid: row.get(7)?,
        age: row.get(8)?,
        gender: row.get(9)?,
        doctor_id: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn visit_from_row(row: &Row<'_>) -> rusqlite::Result<VisitRecord> {
    let medicines = match row.get::<_, serde_json::Value>(11)? {
        serde_json::Value::Array(items) => items,
        _ => Vec::new(),
    };

    Ok(VisitRecord {
        id: row.get(0)?,
        patient: row.get(1)?,
        mobile: row.get(2)?,
        diagnosis: row.get(3)?,
        other_diagnosis: row.get(4)?,
        weight: row.get(5)?,
        sbp: row.get(6)?,
        dbp: row.get(7)?,
        status: row.get(8)?,
        can_walk: row.get(9)?,
        can_climb: row.get(10)?,
        medicines,
        created_by: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<ReportBundle> {
    Ok(ReportBundle {
        id: row.get(0)?,
        patient: row.get(1)?,
        mobile: row.get(2)?,
        time: row.get(3)?,
        files: BTreeMap::new(),
    })
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<(Uuid, ReportCategory, FileMeta)> {
    Ok((
        row.get(0)?,
        parse_column(row, 1)?,
        FileMeta {
            path: row.get(2)?,
            url: row.get(3)?,
            kind: parse_column(row, 4)?,
            original_name: row.get(5)?,
            size: row.get::<_, i64>(6)? as u64,
            uploaded_at: row.get(7)?,
        },
    ))
}

/// Reads a TEXT column holding an enum tag.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn unique_violation(err: rusqlite::Error) -> DbError {
    if let rusqlite::Error::SqliteFailure(code, msg) = &err {
        if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            let constraint = msg
                .as_deref()
                .and_then(|m| m.strip_prefix("UNIQUE constraint failed: "))
                .unwrap_or("unknown")
                .to_string();
            return DbError::Conflict { constraint };
        }
    }
    err.into()
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
