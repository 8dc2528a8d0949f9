use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{extract::State, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use vitalis_db::Database;
use vitalis_db::models::NewUser;
use vitalis_types::api::{Claims, DoctorSummary, LoginRequest, LoginResponse, ProfileResponse};
use vitalis_types::models::{Identity, Role};

use crate::error::{ApiError, ApiResult, blocking, ok, required};
use crate::extract::{Caller, Payload};
use crate::storage::Storage;

/// Credentials stay valid for a week.
const TOKEN_TTL_DAYS: i64 = 7;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub jwt_secret: String,
}

pub async fn login(
    State(state): State<AppState>,
    Payload(req): Payload<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(mobile), Some(password)) = (required(req.mobile), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::validation("Mobile and password are required"));
    };

    let db = state.clone();
    let user = blocking(move || {
        let invalid = || ApiError::Authentication("Invalid mobile or password".into());
        let user = db.db.get_user_by_mobile(&mobile)?.ok_or_else(invalid)?;

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored hash for {} unreadable: {}", user.id, e))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| invalid())?;
        Ok(user)
    })
    .await?;

    let token = create_token(&state.jwt_secret, user.id, user.role)?;
    info!("{} {} logged in", user.role.as_str(), user.id);

    Ok(ok(LoginResponse {
        user_id: user.id,
        role: user.role,
        token,
    }))
}

/// POST /auth/get-details: the caller's own profile. Patients also get
/// their doctor's name and mobile.
pub async fn get_details(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> ApiResult<impl IntoResponse> {
    let doctor_details = match identity.doctor_id() {
        Some(doctor_id) => {
            let db = state.clone();
            let doctor = blocking(move || Ok(db.db.get_identity(&doctor_id)?)).await?;
            doctor.map(|d| DoctorSummary {
                id: d.id,
                name: d.name,
                mobile: d.mobile,
            })
        }
        None => None,
    };

    Ok(ok(ProfileResponse {
        identity,
        doctor_details,
    }))
}

/// Creates an identity unless its mobile is taken. The pre-check and the
/// store's unique constraint report the same conflict, so a caller losing a
/// signup race sees exactly what a sequential duplicate would.
pub(crate) fn register(db: &Database, identity: Identity, password: &str) -> ApiResult<Identity> {
    if db.get_user_by_mobile(&identity.mobile)?.is_some() {
        return Err(ApiError::Conflict("A user with this mobile number already exists".into()));
    }

    let user = NewUser {
        identity,
        password_hash: hash_password(password)?,
    };
    db.create_user(&user)?;

    info!(
        "Registered {} {} ({})",
        user.identity.role().as_str(),
        user.identity.id,
        user.identity.name
    );
    Ok(user.identity)
}

/// Hash password with Argon2id and a random salt.
pub(crate) fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn create_token(secret: &str, user_id: Uuid, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    #[test]
    fn test_token_carries_role_and_week_expiry() {
        let user_id = Uuid::new_v4();
        let token = create_token("secret", user_id, Role::Patient).unwrap();

        let claims = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap()
        .claims;
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Patient);

        let ttl = claims.exp as i64 - chrono::Utc::now().timestamp();
        assert!(ttl > 6 * 24 * 3600 && ttl <= 7 * 24 * 3600);

        assert!(
            decode::<Claims>(&token, &DecodingKey::from_secret(b"other"), &Validation::default())
                .is_err()
        );
    }

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"correct horse", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }
}
