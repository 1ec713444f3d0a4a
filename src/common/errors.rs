use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;

/// Custom error types for request validation and application errors
#[derive(Debug, Clone)]
pub enum BusinessError {
    /// A single invalid field (400 Bad Request)
    ValidationError { field: String, message: String },
    /// Several invalid fields collected from one request (400 Bad Request)
    InvalidFields {
        fields: BTreeMap<String, Vec<String>>,
    },
    /// Business rule violations, e.g. deleting a referenced lookup (409 Conflict)
    BusinessRuleViolation { rule: String, message: String },
    /// Resource not found (404 Not Found)
    NotFound { resource: String, id: String },
    /// Page number outside the result set (404 Not Found)
    InvalidPage { page: String },
    /// Duplicate resource (409 Conflict)
    Duplicate { resource: String, field: String },
    /// Missing, invalid or expired credentials (401 Unauthorized)
    Unauthenticated { message: String },
    /// External service errors (502 Bad Gateway)
    ExternalServiceError { service: String, message: String },
    /// Generic application error (500 Internal Server Error)
    InternalError { message: String },
}

impl BusinessError {
    fn kind(&self) -> &'static str {
        match self {
            BusinessError::ValidationError { .. } => "ValidationError",
            BusinessError::InvalidFields { .. } => "InvalidFields",
            BusinessError::BusinessRuleViolation { .. } => "BusinessRuleViolation",
            BusinessError::NotFound { .. } => "NotFound",
            BusinessError::InvalidPage { .. } => "InvalidPage",
            BusinessError::Duplicate { .. } => "Duplicate",
            BusinessError::Unauthenticated { .. } => "Unauthenticated",
            BusinessError::ExternalServiceError { .. } => "ExternalServiceError",
            BusinessError::InternalError { .. } => "InternalError",
        }
    }

    /// Per-field messages, present only for validation failures.
    pub fn field_errors(&self) -> Option<BTreeMap<String, Vec<String>>> {
        match self {
            BusinessError::ValidationError { field, message } => {
                Some(BTreeMap::from([(field.clone(), vec![message.clone()])]))
            }
            BusinessError::InvalidFields { fields } => Some(fields.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for BusinessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessError::ValidationError { field, message } => {
                write!(f, "Validation failed for field '{field}': {message}")
            }
            BusinessError::InvalidFields { fields } => {
                let names: Vec<&str> = fields.keys().map(String::as_str).collect();
                write!(f, "Validation failed for fields: {}", names.join(", "))
            }
            BusinessError::BusinessRuleViolation { rule, message } => {
                write!(f, "Business rule '{rule}' violated: {message}")
            }
            BusinessError::NotFound { resource, id } => {
                write!(f, "{resource} with id '{id}' not found")
            }
            BusinessError::InvalidPage { .. } => f.write_str("Invalid page."),
            BusinessError::Duplicate { resource, field } => {
                write!(f, "{resource} with this {field} already exists")
            }
            BusinessError::Unauthenticated { message } => f.write_str(message),
            BusinessError::ExternalServiceError { service, message } => {
                write!(f, "External service '{service}' error: {message}")
            }
            BusinessError::InternalError { message } => {
                write!(f, "Internal error: {message}")
            }
        }
    }
}

impl std::error::Error for BusinessError {}

/// Convert `BusinessError` to HTTP responses
impl IntoResponse for BusinessError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            BusinessError::ValidationError { .. } | BusinessError::InvalidFields { .. } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
            }
            BusinessError::BusinessRuleViolation { .. } => {
                (StatusCode::CONFLICT, "BUSINESS_RULE_VIOLATION")
            }
            BusinessError::NotFound { .. } => (StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND"),
            BusinessError::InvalidPage { .. } => (StatusCode::NOT_FOUND, "INVALID_PAGE"),
            BusinessError::Duplicate { .. } => (StatusCode::CONFLICT, "DUPLICATE_RESOURCE"),
            BusinessError::Unauthenticated { .. } => {
                (StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED")
            }
            BusinessError::ExternalServiceError { .. } => {
                (StatusCode::BAD_GATEWAY, "EXTERNAL_SERVICE_ERROR")
            }
            BusinessError::InternalError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        if status.is_server_error() {
            tracing::error!("{self}");
        }

        let mut error = json!({
            "code": error_code,
            "message": self.to_string(),
            "type": self.kind(),
        });
        if let Some(fields) = self.field_errors() {
            error["fields"] = json!(fields);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Maps database errors onto business errors
pub struct ErrorMapper;

impl ErrorMapper {
    /// Map `DbErr` to appropriate HTTP responses with business context
    pub fn map_db_error(err: DbErr, context: &str) -> BusinessError {
        let resource = Self::extract_resource_from_context(context);

        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => {
                return BusinessError::Duplicate {
                    resource,
                    field: Self::extract_field_from_constraint(&msg),
                };
            }
            Some(SqlErr::ForeignKeyConstraintViolation(msg)) => {
                return BusinessError::BusinessRuleViolation {
                    rule: "protected reference".to_string(),
                    message: format!("{resource} is still referenced by other records ({msg})"),
                };
            }
            _ => {}
        }

        match err {
            DbErr::RecordNotFound(msg) => BusinessError::NotFound {
                resource,
                id: Self::extract_id_from_message(&msg),
            },
            DbErr::Conn(conn_err) => BusinessError::ExternalServiceError {
                service: "database".to_string(),
                message: conn_err.to_string(),
            },
            _ => BusinessError::InternalError {
                message: err.to_string(),
            },
        }
    }

    fn extract_resource_from_context(context: &str) -> String {
        context.replace('_', " ")
    }

    /// Looks for `id '<value>'`, falling back to the first integer-looking word
    fn extract_id_from_message(msg: &str) -> String {
        if let Some(start_pos) = msg.find(" id '") {
            let after_id = &msg[start_pos + 5..];
            if let Some(end_pos) = after_id.find('\'') {
                return after_id[..end_pos].to_string();
            }
        }

        msg.split_whitespace()
            .map(|word| word.trim_matches('\'').trim_matches('"'))
            .find(|word| word.parse::<i64>().is_ok())
            .map_or_else(|| "unknown".to_string(), ToString::to_string)
    }

    fn extract_field_from_constraint(msg: &str) -> String {
        ["plate_number", "username"]
            .into_iter()
            .find(|field| msg.contains(field))
            .unwrap_or("field")
            .to_string()
    }
}

#[macro_export]
macro_rules! validation_error {
    ($field:expr, $message:expr) => {
        $crate::common::errors::BusinessError::ValidationError {
            field: $field.to_string(),
            message: $message.to_string(),
        }
    };
}

#[macro_export]
macro_rules! business_rule_violation {
    ($rule:expr, $message:expr) => {
        $crate::common::errors::BusinessError::BusinessRuleViolation {
            rule: $rule.to_string(),
            message: $message.to_string(),
        }
    };
}

#[macro_export]
macro_rules! not_found {
    ($resource:expr, $id:expr) => {
        $crate::common::errors::BusinessError::NotFound {
            resource: $resource.to_string(),
            id: $id.to_string(),
        }
    };
}

#[macro_export]
macro_rules! duplicate_resource {
    ($resource:expr, $field:expr) => {
        $crate::common::errors::BusinessError::Duplicate {
            resource: $resource.to_string(),
            field: $field.to_string(),
        }
    };
}

#[macro_export]
macro_rules! unauthenticated {
    ($message:expr) => {
        $crate::common::errors::BusinessError::Unauthenticated {
            message: $message.to_string(),
        }
    };
}

/// Extension trait to add business error conversion to `DbErr`
pub trait DbErrorExt {
    fn to_business_error(self, context: &str) -> BusinessError;
}

impl DbErrorExt for DbErr {
    fn to_business_error(self, context: &str) -> BusinessError {
        ErrorMapper::map_db_error(self, context)
    }
}

/// Result type alias for business operations
pub type BusinessResult<T> = Result<T, BusinessError>;
