use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use adrift_core::CoreError;

/// HTTP-facing wrapper around the core error taxonomy. Every rejection
/// carries its numeric sub-code in the body so clients can render the
/// specific message.
pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError(e)
    }
}

fn status_for(e: &CoreError) -> StatusCode {
    match e {
        CoreError::InvalidInput(_) | CoreError::EmptyReply | CoreError::SelfReply => {
            StatusCode::BAD_REQUEST
        }
        CoreError::NotFound => StatusCode::NOT_FOUND,
        CoreError::Forbidden => StatusCode::FORBIDDEN,
        CoreError::NotMemorial
        | CoreError::Conflict(_)
        | CoreError::ReplyCapReached
        | CoreError::NoValidHold => StatusCode::CONFLICT,
        CoreError::AuthorDailyCap
        | CoreError::IpDailyCap
        | CoreError::CooldownActive { .. }
        | CoreError::Banned { .. }
        | CoreError::AlreadyHolding
        | CoreError::DredgeCooldown => StatusCode::TOO_MANY_REQUESTS,
        CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);

        if let CoreError::Store(inner) = &self.0 {
            error!("store error: {inner:#}");
            // no internals in the body
            let body = serde_json::json!({ "ok": false, "message": "internal error" });
            return (status, Json(body)).into_response();
        }

        let mut body = serde_json::json!({
            "ok": false,
            "message": self.0.to_string(),
        });
        if let Some(code) = self.0.code() {
            body["error_code"] = code.into();
        }
        if let Some(retry_after) = self.0.retry_after() {
            body["retry_after"] = retry_after.into();
        }
        if let Some(until) = self.0.banned_until() {
            body["until"] = until.into();
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(status_for(&CoreError::EmptyReply), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&CoreError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&CoreError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(status_for(&CoreError::ReplyCapReached), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&CoreError::AlreadyHolding),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(&CoreError::Banned { until: 0 }),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
