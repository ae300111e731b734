use poem::{error::ResponseError, http::StatusCode, web::Json, IntoResponse, Response};

#[derive(thiserror::Error, Debug)]
pub enum SprintboardError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("tracker request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("issue {issue_id} is missing field `{field}`")]
    AggregationFault {
        issue_id: String,
        field: &'static str,
    },
}

pub type Result<T, E = SprintboardError> = std::result::Result<T, E>;

impl SprintboardError {
    pub fn missing_field(issue_id: &str, field: &'static str) -> Self {
        Self::AggregationFault {
            issue_id: issue_id.to_string(),
            field,
        }
    }

    /// Message safe to hand back to API callers.
    fn public_message(&self) -> String {
        match self {
            SprintboardError::InvalidArgument(_) => self.to_string(),
            SprintboardError::Upstream(_) if self.status() == StatusCode::GATEWAY_TIMEOUT => {
                "tracker request timed out".to_string()
            }
            SprintboardError::Upstream(_) => "tracker request failed".to_string(),
            SprintboardError::AggregationFault { .. } => "internal error".to_string(),
        }
    }
}

impl ResponseError for SprintboardError {
    fn status(&self) -> StatusCode {
        match self {
            SprintboardError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            SprintboardError::Upstream(err) if err.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            SprintboardError::Upstream(_) => StatusCode::BAD_GATEWAY,
            SprintboardError::AggregationFault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn as_response(&self) -> Response {
        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}
