//! Tests for error types

#[cfg(test)]
mod tests {
    use super::super::error::*;

    #[test]
    fn test_invalid_request_display() {
        let err = MonitorError::InvalidRequest("minLatency must be a number".to_string());
        assert_eq!(err.to_string(), "Invalid request: minLatency must be a number");
    }

    #[test]
    fn test_upstream_display() {
        let err = MonitorError::Upstream("status 502".to_string());
        assert_eq!(err.to_string(), "Upstream API error: status 502");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(MonitorError::InvalidRequest("x".into()).is_client_error());
        assert!(MonitorError::NotFound("x".into()).is_client_error());
        assert!(!MonitorError::Internal("x".into()).is_client_error());
        assert!(!MonitorError::Upstream("x".into()).is_client_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: MonitorError = json_err.into();
        assert!(matches!(err, MonitorError::Json(_)));
    }

    #[test]
    fn test_from_sqlx_error() {
        let err: MonitorError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, MonitorError::Database(_)));
        assert!(err.to_string().starts_with("Database error"));
    }
}
