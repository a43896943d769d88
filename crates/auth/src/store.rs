//! Persistence port for accounts.
//!
//! The registry owns the rules; stores own atomicity. Implementations live in
//! `hrdesk-infra`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hrdesk_core::AccountId;

use crate::account::{Account, AccountKind, AccountRecord, Position};
use crate::policy::{AdmissionCheck, Denial, RoleCounts};

/// Store operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write. `field` is `name`, `email` or `mobile`.
    #[error("duplicate value for unique field '{field}'")]
    Duplicate { field: String },

    /// The admission check, re-run inside the write, refused the role.
    #[error("role admission denied: {0}")]
    Denied(Denial),

    #[error("record not found")]
    NotFound,

    /// The record changed since it was read; the write was not applied.
    #[error("record was modified concurrently")]
    Stale,

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn duplicate(field: impl Into<String>) -> Self {
        Self::Duplicate {
            field: field.into(),
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// A write timestamp strictly after `previous`, truncated to microseconds so
/// every backend stores it exactly. `updated_at` doubles as the record's
/// revision, so it must move on every write.
pub fn advance_timestamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    if now > previous {
        now
    } else {
        previous.trunc_subsecs(6) + Duration::microseconds(1)
    }
}

/// Field an employee listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    #[serde(alias = "createdAt")]
    CreatedAt,
    Name,
    Email,
    Salary,
    Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Employee listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeQuery {
    /// 1-based.
    pub page: u32,
    pub limit: u32,
    /// Case-insensitive substring match on name or email.
    pub search: Option<String>,
    pub position: Option<Position>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
}

impl EmployeeQuery {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    /// Rows skipped before the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for EmployeeQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
            search: None,
            position: None,
            min_salary: None,
            max_salary: None,
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeePage {
    pub employees: Vec<Account>,
    pub current_page: u32,
    pub total_pages: u64,
    pub total: u64,
}

impl EmployeePage {
    pub fn new(employees: Vec<Account>, query: &EmployeeQuery, total: u64) -> Self {
        let limit = u64::from(query.limit.max(1));
        Self {
            employees,
            current_page: query.page,
            total_pages: total.div_ceil(limit),
            total,
        }
    }
}

/// Per-position aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentStats {
    pub name: String,
    pub count: u64,
    pub average_salary: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EmployeeStats {
    pub total_employees: u64,
    pub total_salary: f64,
    /// Sorted by `count`, largest first.
    pub departments: Vec<DepartmentStats>,
}

/// Unique-constraint-enforcing account storage.
///
/// Implementations must:
/// - enforce uniqueness of `name`, `lower(email)` and employee `mobile`,
///   reporting violations as [`StoreError::Duplicate`]
/// - run the supplied [`AdmissionCheck`] against role counts taken inside the
///   same critical section (lock or transaction) as the write, so two
///   concurrent writers can never both consume the last slot of a role
/// - refuse an `update` whose `expected` timestamp no longer matches the
///   stored `updated_at`, with [`StoreError::Stale`]
/// - make a record visible only once it is completely written
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get(&self, id: AccountId) -> Result<Option<AccountRecord>, StoreError>;

    /// One lookup over both fields; an email match wins over a name match.
    async fn find_by_email_or_name(
        &self,
        email: &str,
        name: &str,
    ) -> Result<Option<AccountRecord>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, StoreError>;

    /// ADMIN/MANAGER populations, optionally not counting `exclude`.
    async fn role_counts(&self, exclude: Option<AccountId>) -> Result<RoleCounts, StoreError>;

    /// Insert a new record after `check` admits its role.
    async fn insert(&self, record: AccountRecord, check: AdmissionCheck) -> Result<(), StoreError>;

    /// Replace an existing record that still carries `expected` as its
    /// `updated_at`. Whenever the written role is capacity-limited, `check`
    /// runs against counts that exclude the record itself.
    async fn update(
        &self,
        record: AccountRecord,
        expected: DateTime<Utc>,
        check: AdmissionCheck,
    ) -> Result<(), StoreError>;

    /// Stamp a successful login: sets the employee `last_login` and moves
    /// `updated_at` forward, leaving every other field as stored.
    async fn record_login(&self, id: AccountId, at: DateTime<Utc>) -> Result<AccountRecord, StoreError>;

    async fn delete(&self, id: AccountId) -> Result<(), StoreError>;

    /// All accounts of one kind, oldest first.
    async fn list(&self, kind: AccountKind) -> Result<Vec<AccountRecord>, StoreError>;

    async fn query_employees(&self, query: &EmployeeQuery) -> Result<EmployeePage, StoreError>;

    async fn employee_stats(&self) -> Result<EmployeeStats, StoreError>;
}

#[async_trait]
impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    async fn get(&self, id: AccountId) -> Result<Option<AccountRecord>, StoreError> {
        (**self).get(id).await
    }

    async fn find_by_email_or_name(
        &self,
        email: &str,
        name: &str,
    ) -> Result<Option<AccountRecord>, StoreError> {
        (**self).find_by_email_or_name(email, name).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, StoreError> {
        (**self).find_by_email(email).await
    }

    async fn role_counts(&self, exclude: Option<AccountId>) -> Result<RoleCounts, StoreError> {
        (**self).role_counts(exclude).await
    }

    async fn insert(&self, record: AccountRecord, check: AdmissionCheck) -> Result<(), StoreError> {
        (**self).insert(record, check).await
    }

    async fn update(
        &self,
        record: AccountRecord,
        expected: DateTime<Utc>,
        check: AdmissionCheck,
    ) -> Result<(), StoreError> {
        (**self).update(record, expected, check).await
    }

    async fn record_login(&self, id: AccountId, at: DateTime<Utc>) -> Result<AccountRecord, StoreError> {
        (**self).record_login(id, at).await
    }

    async fn delete(&self, id: AccountId) -> Result<(), StoreError> {
        (**self).delete(id).await
    }

    async fn list(&self, kind: AccountKind) -> Result<Vec<AccountRecord>, StoreError> {
        (**self).list(kind).await
    }

    async fn query_employees(&self, query: &EmployeeQuery) -> Result<EmployeePage, StoreError> {
        (**self).query_employees(query).await
    }

    async fn employee_stats(&self) -> Result<EmployeeStats, StoreError> {
        (**self).employee_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advanced_timestamps_always_move_forward() {
        let now = Utc::now();
        let later = advance_timestamp(now, now);
        assert!(later > now);
        assert_eq!(later, later.trunc_subsecs(6));
        assert!(advance_timestamp(later, now) > later);

        let future = now + Duration::seconds(5);
        assert_eq!(advance_timestamp(now, future), future.trunc_subsecs(6));
    }

    #[test]
    fn page_math() {
        let query = EmployeeQuery {
            page: 3,
            limit: 10,
            ..Default::default()
        };
        assert_eq!(query.offset(), 20);

        let page = EmployeePage::new(Vec::new(), &query, 21);
        assert_eq!(page.total_pages, 3);
        assert_eq!(EmployeePage::new(Vec::new(), &query, 0).total_pages, 0);
    }

    #[test]
    fn sort_field_accepts_legacy_camel_case() {
        let field: SortField = serde_json::from_str("\"createdAt\"").unwrap();
        assert_eq!(field, SortField::CreatedAt);
        let field: SortField = serde_json::from_str("\"salary\"").unwrap();
        assert_eq!(field, SortField::Salary);
    }
}
