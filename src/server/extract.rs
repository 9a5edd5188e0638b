//! Request body extraction

use crate::core::error::{DocketError, RequestError};
use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// JSON body whose failures are reported as [`DocketError`]s
///
/// Malformed JSON or a wrong content type is `INVALID_BODY`; JSON that
/// does not fit the target type is `VALIDATION_ERROR`. Both are 400.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = DocketError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| RequestError::InvalidBody {
                message: rejection.body_text(),
            })?;
        Ok(Payload(serde_json::from_value(value)?))
    }
}
