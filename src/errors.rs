//! Unified error types for every core operation.
//!
//! Each variant maps onto one user-facing error category. The boundary layer
//! turns an [`Error`] into an [`ErrorPayload`] via [`Error::payload`].

use sea_orm::DbErr;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A single problem with one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field path, e.g. `cooking_time` or `ingredients[2].amount`
    pub field: String,
    /// Human-readable description of what is wrong
    pub message: String,
}

/// Accumulated field errors from one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Creates an empty error list.
    #[must_use]
    pub const fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Records a problem with `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Appends every error from `other`.
    pub fn merge(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// All recorded errors in the order they were found.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns true if at least one error was recorded for `field`.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Converts into `Ok(())` when nothing was recorded, otherwise into [`Error::Validation`].
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{entity} already exists")]
    Conflict { entity: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Permission denied: {message}")]
    Permission { message: String },

    #[error("Shopping cart is empty")]
    EmptyCart,

    #[error("Short link is invalid: {token:?}")]
    InvalidToken { token: String },
}

impl Error {
    /// Shorthand for a single-field [`Error::Validation`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Permission { .. } => ErrorKind::Permission,
            Self::EmptyCart => ErrorKind::EmptyCart,
            Self::InvalidToken { .. } => ErrorKind::InvalidToken,
            Self::Database(_) | Self::Config { .. } => ErrorKind::Internal,
        }
    }

    /// Builds the structured body the boundary layer sends back to the user.
    ///
    /// Internal failures are reported without their details.
    #[must_use]
    pub fn payload(&self) -> ErrorPayload {
        let kind = self.kind();
        let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
        if let Self::Validation(errors) = self {
            for error in errors.errors() {
                fields
                    .entry(error.field.clone())
                    .or_default()
                    .push(error.message.clone());
            }
        }
        let detail = match kind {
            ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        };
        ErrorPayload {
            kind,
            status: kind.status(),
            detail,
            fields,
        }
    }
}

/// User-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or out-of-range input
    Validation,
    /// The pair or value already exists
    Conflict,
    /// Referenced entity is absent
    NotFound,
    /// Actor may not perform the mutation
    Permission,
    /// Shopping list requested for an empty cart
    EmptyCart,
    /// Short link does not decode
    InvalidToken,
    /// Store or configuration failure
    Internal,
}

impl ErrorKind {
    /// HTTP status the boundary layer answers with.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::Validation | Self::Conflict | Self::EmptyCart => 400,
            Self::Permission => 403,
            Self::NotFound | Self::InvalidToken => 404,
            Self::Internal => 500,
        }
    }
}

/// Serializable error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Vec<String>>,
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
