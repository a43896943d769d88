use serde::{Deserialize, Serialize};

use hrdesk_auth::normalize::merge_validation;
use hrdesk_auth::{Account, EmployeeQuery, Position, SortField, SortOrder};
use hrdesk_core::{DomainError, DomainResult, FieldErrors};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    /// Both fields must be present before a credential check is attempted.
    pub fn validate(&self) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result()
    }
}

/// Raw `GET /api/employees` query string.
#[derive(Debug, Default, Deserialize)]
pub struct EmployeeListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub position: Option<String>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
}

impl EmployeeListParams {
    pub fn into_query(self) -> DomainResult<EmployeeQuery> {
        let defaults = EmployeeQuery::default();

        let position = self.position.as_deref().filter(|p| !p.trim().is_empty()).map(str::parse::<Position>);
        let sort_by = self.sort_by.as_deref().map(parse_sort_field);
        let sort_order = self.sort_order.as_deref().map(parse_sort_order);

        merge_validation(
            [
                position.as_ref().and_then(|r| r.clone().err()),
                sort_by.as_ref().and_then(|r| r.clone().err()),
                sort_order.as_ref().and_then(|r| r.clone().err()),
            ]
            .into_iter()
            .flatten(),
        )?;

        Ok(EmployeeQuery {
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
            search: self.search.filter(|s| !s.trim().is_empty()),
            position: position.transpose()?,
            min_salary: self.min_salary,
            max_salary: self.max_salary,
            sort_by: sort_by.transpose()?.unwrap_or(defaults.sort_by),
            sort_order: sort_order.transpose()?.unwrap_or(defaults.sort_order),
        })
    }
}

fn parse_sort_field(raw: &str) -> DomainResult<SortField> {
    match raw.trim() {
        "created_at" | "createdAt" => Ok(SortField::CreatedAt),
        "name" => Ok(SortField::Name),
        "email" => Ok(SortField::Email),
        "salary" => Ok(SortField::Salary),
        "position" => Ok(SortField::Position),
        _ => Err(DomainError::validation(
            "sort_by",
            "sort_by must be one of: created_at, name, email, salary, position",
        )),
    }
}

fn parse_sort_order(raw: &str) -> DomainResult<SortOrder> {
    match raw.trim().to_lowercase().as_str() {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        _ => Err(DomainError::validation("sort_order", "sort_order must be asc or desc")),
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct EmployeeUpdated {
    pub message: &'static str,
    pub employee: Account,
}
