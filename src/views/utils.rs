use poem::http::StatusCode;

/// Logs every error leaving the router: 4xx as warnings (404 skipped), the
/// rest as errors.
pub fn log_error(err: &poem::Error) {
    let status = err.status();
    if status.is_client_error() {
        if status != StatusCode::NOT_FOUND {
            tracing::warn!(status = status.as_u16(), "{}", err);
        }
    } else {
        tracing::error!(status = status.as_u16(), "{}", err);
    }
}
