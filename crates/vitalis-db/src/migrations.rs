use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          BLOB PRIMARY KEY,
                mobile      TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL CHECK (role IN ('doctor', 'patient')),
                name        TEXT NOT NULL,
                email       TEXT,
                hospital    TEXT,
                uhid        TEXT UNIQUE,
                age         INTEGER,
                gender      TEXT,
                doctor_id   BLOB REFERENCES users(id),
                created_at  TEXT NOT NULL,
                CHECK (
                    (role = 'doctor' AND hospital IS NOT NULL AND doctor_id IS NULL)
                    OR (role = 'patient' AND uhid IS NOT NULL AND age IS NOT NULL
                        AND gender IS NOT NULL AND doctor_id IS NOT NULL)
                )
            );

            CREATE INDEX idx_users_doctor ON users(doctor_id);

            -- Legacy readings, read-only through the API.
            CREATE TABLE daily_readings (
                id          BLOB PRIMARY KEY,
                patient_id  BLOB NOT NULL REFERENCES users(id),
                time        TEXT NOT NULL,
                sbp         REAL,
                dbp         REAL,
                weight      REAL
            );

            CREATE INDEX idx_daily_readings_patient ON daily_readings(patient_id);

            CREATE TABLE visit_records (
                id              BLOB PRIMARY KEY,
                patient_id      BLOB NOT NULL REFERENCES users(id),
                mobile          TEXT NOT NULL,
                diagnosis       TEXT,
                other_diagnosis TEXT NOT NULL DEFAULT '',
                weight          REAL,
                sbp             REAL,
                dbp             REAL,
                status          TEXT,
                can_walk        INTEGER,
                can_climb       INTEGER,
                medicines       TEXT NOT NULL DEFAULT '[]',
                created_by      BLOB NOT NULL REFERENCES users(id),
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_visit_records_patient ON visit_records(patient_id);
            CREATE INDEX idx_visit_records_mobile ON visit_records(mobile, created_at);

            CREATE TABLE messages (
                id          BLOB PRIMARY KEY,
                sender_id   BLOB NOT NULL REFERENCES users(id),
                receiver_id BLOB NOT NULL REFERENCES users(id),
                kind        TEXT NOT NULL CHECK (kind IN ('text', 'audio')),
                text        TEXT,
                filename    TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_messages_pair ON messages(sender_id, receiver_id, created_at);

            CREATE TABLE reports (
                id          BLOB PRIMARY KEY,
                patient_id  BLOB NOT NULL REFERENCES users(id),
                mobile      TEXT NOT NULL,
                time        TEXT NOT NULL
            );

            CREATE INDEX idx_reports_patient ON reports(patient_id, time);

            CREATE TABLE report_files (
                report_id       BLOB NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
                category        TEXT NOT NULL,
                path            TEXT NOT NULL,
                url             TEXT NOT NULL,
                kind            TEXT NOT NULL CHECK (kind IN ('image', 'pdf')),
                original_name   TEXT NOT NULL,
                size            INTEGER NOT NULL,
                uploaded_at     TEXT NOT NULL,
                PRIMARY KEY (report_id, category)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
