//! Request extractors.

use axum::extract::{FromRequest, rejection::JsonRejection};

use super::error::ApiError;

/// JSON body whose rejections answer as a 400 [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}
