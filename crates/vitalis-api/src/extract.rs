use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use vitalis_types::models::{Identity, Profile};

use crate::error::ApiError;

/// The authenticated identity attached by `require_auth`.
#[derive(Debug, Clone)]
pub struct Caller(pub Identity);

/// Caller that must be a doctor.
#[derive(Debug, Clone)]
pub struct Doctor(pub Identity);

/// Caller that must be a patient.
#[derive(Debug, Clone)]
pub struct Patient(pub Identity);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or_else(|| ApiError::Authentication("Missing bearer token".into()))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Doctor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Caller(identity) = Caller::from_request_parts(parts, state).await?;
        match identity.profile {
            Profile::Doctor { .. } => Ok(Doctor(identity)),
            Profile::Patient { .. } => Err(ApiError::Authorization("Doctor access required".into())),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Patient {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Caller(identity) = Caller::from_request_parts(parts, state).await?;
        match identity.profile {
            Profile::Patient { .. } => Ok(Patient(identity)),
            Profile::Doctor { .. } => Err(ApiError::Authorization("Patient access required".into())),
        }
    }
}

/// JSON body whose rejections use the API error envelope.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        Ok(Payload(value))
    }
}
