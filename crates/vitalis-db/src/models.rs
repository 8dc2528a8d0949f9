//! Database row types for identities. Vitals, messages and reports map
//! straight onto `vitalis_types::models`; users get their own row because
//! the password hash must never leave this crate's callers by accident.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use vitalis_types::models::{Identity, Profile, Role};

use crate::DbError;

pub struct UserRow {
    pub id: Uuid,
    pub mobile: String,
    pub password: String,
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
    pub hospital: Option<String>,
    pub uhid: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub doctor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_identity(self) -> Result<Identity, DbError> {
        let profile = match self.role {
            Role::Doctor => Profile::Doctor {
                hospital: self.hospital.unwrap_or_default(),
            },
            Role::Patient => match (self.uhid, self.age, self.gender, self.doctor_id) {
                (Some(uhid), Some(age), Some(gender), Some(doctor)) => Profile::Patient {
                    uhid,
                    age,
                    gender,
                    doctor,
                },
                _ => {
                    return Err(DbError::Corrupt(format!(
                        "patient {} is missing patient attributes",
                        self.id
                    )));
                }
            },
        };

        Ok(Identity {
            id: self.id,
            name: self.name,
            mobile: self.mobile,
            email: self.email,
            created_at: self.created_at,
            profile,
        })
    }
}

/// An identity about to be inserted, with its already-hashed password.
pub struct NewUser {
    pub identity: Identity,
    pub password_hash: String,
}
