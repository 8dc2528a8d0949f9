/// Shared types for the Vitalis backend.
///
/// `models` holds the domain records as the stores hand them out;
/// `api` holds request/response bodies and the response envelope.
pub mod api;
pub mod models;
