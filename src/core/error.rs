//! Typed error handling for the docket service
//!
//! Every fallible lifecycle operation returns [`DocketResult`]. Errors are
//! grouped by category so callers (and the HTTP layer) can react to the
//! category rather than to message text.
//!
//! # Error Categories
//!
//! - [`EntityError`]: a referenced document does not exist, or already exists
//! - [`ValidationError`]: malformed or missing input, rejected before any write
//! - [`ConflictError`]: business-rule conflicts (duplicate docket, exhausted code series, ...)
//! - [`RequestError`]: identity problems (missing caller, role predicate failed)
//! - [`StorageError`]: persistence failures
//! - [`ConfigError`]: configuration loading and validation
//!
//! # Example
//!
//! ```rust,ignore
//! match manifests.remove_order(&caller, manifest_id, order_id).await {
//!     Ok(manifest) => println!("{} orders left", manifest.orders.len()),
//!     Err(DocketError::Entity(EntityError::NotFound { entity_type, id })) => {
//!         println!("{entity_type} {id} not found");
//!     }
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// The main error type of the crate
#[derive(Debug, Error)]
pub enum DocketError {
    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Should not happen in normal operation
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl DocketError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DocketError::Entity(e) => e.status_code(),
            DocketError::Validation(_) => StatusCode::BAD_REQUEST,
            DocketError::Conflict(e) => e.status_code(),
            DocketError::Request(e) => e.status_code(),
            DocketError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DocketError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DocketError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DocketError::Entity(e) => e.error_code(),
            DocketError::Validation(e) => e.error_code(),
            DocketError::Conflict(e) => e.error_code(),
            DocketError::Request(e) => e.error_code(),
            DocketError::Storage(_) => "STORAGE_ERROR",
            DocketError::Config(_) => "CONFIG_ERROR",
            DocketError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller only gets a generic message for this error
    pub fn is_unexpected(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Convert to an error response
    ///
    /// Unexpected errors never leak their message; it goes to the log instead.
    pub fn to_response(&self) -> ErrorResponse {
        let message = if self.is_unexpected() {
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        };

        ErrorResponse {
            code: self.error_code().to_string(),
            message,
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            DocketError::Entity(EntityError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({ "entity_type": entity_type, "id": id }))
            }
            DocketError::Entity(EntityError::MissingReferences { entity_type, ids }) => {
                Some(serde_json::json!({ "entity_type": entity_type, "ids": ids }))
            }
            DocketError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            DocketError::Conflict(ConflictError::AlreadyAssigned {
                order_id,
                aggregate,
                holder_id,
            }) => Some(serde_json::json!({
                "order_id": order_id,
                "aggregate": aggregate,
                "holder_id": holder_id,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for DocketError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_unexpected() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        }
        (status, Json(self.to_response())).into_response()
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// A referenced document is missing or already present
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: String },

    /// Some of N referenced ids do not exist; the whole operation is rejected
    #[error("Some {entity_type} ids do not exist: {}", .ids.join(", "))]
    MissingReferences { entity_type: String, ids: Vec<String> },

    #[error("{entity_type} with id '{id}' already exists")]
    AlreadyExists { entity_type: String, id: String },
}

impl EntityError {
    pub fn not_found(entity_type: &str, id: impl ToString) -> Self {
        EntityError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
            EntityError::MissingReferences { .. } => StatusCode::NOT_FOUND,
            EntityError::AlreadyExists { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::MissingReferences { .. } => "MISSING_REFERENCES",
            EntityError::AlreadyExists { .. } => "ENTITY_ALREADY_EXISTS",
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Malformed or missing input
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Validation error for field '{field}': {message}")]
    FieldError { field: String, message: String },

    #[error("Validation errors: {}", format_field_errors(.0))]
    FieldErrors(Vec<FieldValidationError>),

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Unknown {kind} status '{value}'")]
    InvalidStatus { kind: String, value: String },

    #[error("{aggregate} requires at least one order id")]
    EmptyOrderList { aggregate: String },

    #[error("No unique items to create")]
    NoUniqueItems,
}

/// A single field validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

fn format_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ValidationError::FieldError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::NoUniqueItems => "NO_UNIQUE_ITEMS",
            ValidationError::EmptyOrderList { .. } => "EMPTY_ORDER_LIST",
            ValidationError::InvalidStatus { .. } => "INVALID_STATUS",
            _ => "VALIDATION_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldValidationError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}

impl From<validator::ValidationErrors> for DocketError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DocketError::Validation(errors.into())
    }
}

// =============================================================================
// Conflict Errors
// =============================================================================

/// Business-rule conflicts; the input is left unchanged
#[derive(Debug, Error)]
pub enum ConflictError {
    #[error("Docket number '{docket_number}' already exists")]
    DuplicateDocket { docket_number: String },

    /// The letter of a code series would advance past `Z`
    #[error("Code series for prefix '{prefix}' is exhausted")]
    SeriesExhausted { prefix: String },

    #[error("Order '{order_id}' is already open in {aggregate} '{holder_id}'")]
    AlreadyAssigned {
        order_id: String,
        aggregate: String,
        holder_id: String,
    },

    /// Compare-and-set on a code counter kept losing to concurrent writers
    #[error("Could not issue a code for '{key}' after {attempts} attempts")]
    SequenceContention { key: String, attempts: u32 },
}

impl ConflictError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConflictError::SeriesExhausted { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ConflictError::DuplicateDocket { .. } => "DUPLICATE_DOCKET",
            ConflictError::SeriesExhausted { .. } => "SERIES_EXHAUSTED",
            ConflictError::AlreadyAssigned { .. } => "ALREADY_ASSIGNED",
            ConflictError::SequenceContention { .. } => "SEQUENCE_CONTENTION",
        }
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Identity-related request errors
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    #[error("Invalid request body: {message}")]
    InvalidBody { message: String },
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            RequestError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            RequestError::InvalidBody { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::Unauthorized { .. } => "UNAUTHORIZED",
            RequestError::AccessDenied { .. } => "ACCESS_DENIED",
            RequestError::InvalidBody { .. } => "INVALID_BODY",
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {message}")]
    Backend { message: String },

    #[error("Data integrity error: {message}")]
    Integrity { message: String },
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{f}'")).unwrap_or_default())]
    Parse {
        file: Option<String>,
        message: String,
    },

    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for DocketError {
    fn from(err: serde_json::Error) -> Self {
        DocketError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for DocketError {
    fn from(err: serde_yaml::Error) -> Self {
        DocketError::Config(ConfigError::Parse {
            file: None,
            message: err.to_string(),
        })
    }
}

/// Storage traits report through `anyhow`; at the service boundary that is
/// a backend failure unless a typed error was carried inside.
impl From<anyhow::Error> for DocketError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DocketError>() {
            Ok(typed) => typed,
            Err(err) => DocketError::Storage(StorageError::Backend {
                message: format!("{err:#}"),
            }),
        }
    }
}

/// A specialized Result type for docket operations
pub type DocketResult<T> = Result<T, DocketError>;
