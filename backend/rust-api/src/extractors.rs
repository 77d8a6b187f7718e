use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Custom JSON extractor that returns JSON error responses instead of plain text.
///
/// Keeps axum's status for the rejection: 422 when the body is valid JSON of
/// the wrong shape (missing or mistyped fields), 400 for a syntax error, 415
/// for a missing `Content-Type`.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(rejection_response(rejection)),
        }
    }
}

fn rejection_response(rejection: JsonRejection) -> Response {
    let status = rejection.status();
    let message = format!("Failed to parse JSON request body: {}", rejection.body_text());
    tracing::warn!(status = status.as_u16(), "{}", message);

    let error_response = json!({
        "message": message,
        "status": status.as_u16()
    });
    (status, Json(error_response)).into_response()
}
