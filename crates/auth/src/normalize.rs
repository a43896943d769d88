//! Error normalizer: the one place failures become the boundary error shape.
//!
//! Every failure source in this crate converts into [`DomainError`], and
//! [`normalize`] renders a `DomainError` as `{kind, message, fields?}`.

use std::collections::BTreeMap;

use serde::Serialize;

use hrdesk_core::{DomainError, ErrorKind, FieldErrors};

use crate::authorize::AuthzError;
use crate::credential::CredentialError;
use crate::policy::Denial;
use crate::store::StoreError;
use crate::token::TokenError;

/// Uniform error representation returned across the core boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

/// Render `err` in the uniform shape.
///
/// `Internal` causes are logged here and replaced with a generic message.
pub fn normalize(err: &DomainError) -> ErrorBody {
    let kind = err.kind();
    let (message, fields) = match err {
        DomainError::Validation(fields) => (
            "Validation Failed".to_string(),
            Some(fields.as_map().clone()),
        ),
        DomainError::Conflict { field, message } => {
            let mut conflicting = BTreeMap::new();
            conflicting.insert(field.clone(), vec![message.clone()]);
            (message.clone(), Some(conflicting))
        }
        DomainError::NotFound => ("Resource not found".to_string(), None),
        DomainError::InvalidCredential => ("Invalid credentials".to_string(), None),
        DomainError::InvalidToken => ("Token is not valid".to_string(), None),
        DomainError::ExpiredToken => ("Token has expired".to_string(), None),
        DomainError::Forbidden(msg) => (msg.clone(), None),
        DomainError::Internal(cause) => {
            tracing::error!(cause = %cause, "internal error");
            ("Internal Server Error".to_string(), None)
        }
    };

    ErrorBody {
        kind,
        message,
        fields,
    }
}

impl From<&DomainError> for ErrorBody {
    fn from(value: &DomainError) -> Self {
        normalize(value)
    }
}

impl From<Denial> for DomainError {
    fn from(value: Denial) -> Self {
        DomainError::conflict("role", value.reason)
    }
}

impl From<StoreError> for DomainError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Duplicate { field } => {
                let message = format!("{field} already exists");
                DomainError::Conflict { field, message }
            }
            StoreError::Denied(denial) => denial.into(),
            StoreError::NotFound => DomainError::NotFound,
            StoreError::Stale => {
                DomainError::conflict("id", "Account was modified concurrently, please retry")
            }
            StoreError::Backend(msg) => DomainError::Internal(msg),
        }
    }
}

impl From<CredentialError> for DomainError {
    fn from(value: CredentialError) -> Self {
        match value {
            CredentialError::Empty => DomainError::validation("password", "Password is required"),
            CredentialError::TooLong => DomainError::validation("password", value.to_string()),
            CredentialError::Config(_) | CredentialError::Hashing(_) => {
                DomainError::Internal(value.to_string())
            }
        }
    }
}

impl From<TokenError> for DomainError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Expired => DomainError::ExpiredToken,
            TokenError::Invalid(_) => DomainError::InvalidToken,
            TokenError::MissingSecret | TokenError::Encoding(_) => {
                DomainError::Internal(value.to_string())
            }
        }
    }
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::Forbidden(value.to_string())
    }
}

/// Merge several validation failures; any other error wins as-is.
pub fn merge_validation(errors: impl IntoIterator<Item = DomainError>) -> Result<(), DomainError> {
    let mut merged = FieldErrors::new();
    for err in errors {
        match err {
            DomainError::Validation(fields) => merged.merge(fields),
            other => return Err(other),
        }
    }
    merged.into_result()
}
