use http::StatusCode;
use relay_core::HttpError;
use thiserror::Error;

/// Policy headers that are malformed or incomplete
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyValidationError {
    #[error("{service} token cannot be empty when the service is enabled")]
    MissingToken { service: &'static str },

    #[error("{service} requires '{field}' when enabled")]
    MissingField { service: &'static str, field: &'static str },

    #[error("header {header} must be visible ASCII text")]
    InvalidHeader { header: String },
}

impl HttpError for PolicyValidationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_type(&self) -> &str {
        "policy_validation_error"
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}

/// A call the tenant policy does not allow
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unauthorized operation: {service}.{operation} - {details}")]
pub struct UnauthorizedOperation {
    pub service: String,
    pub operation: String,
    pub details: String,
}

impl UnauthorizedOperation {
    pub fn new(service: impl Into<String>, operation: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_client_errors() {
        let err = PolicyValidationError::MissingField {
            service: "snowflake",
            field: "account",
        };

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_type(), "policy_validation_error");
        assert_eq!(err.client_message(), "snowflake requires 'account' when enabled");
    }

    #[test]
    fn unauthorized_message_names_the_operation() {
        let err = UnauthorizedOperation::new("databricks", "get_space", "space 'x' is not in the allowed spaces");
        assert_eq!(
            err.to_string(),
            "Unauthorized operation: databricks.get_space - space 'x' is not in the allowed spaces"
        );
    }
}
