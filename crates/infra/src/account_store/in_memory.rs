use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hrdesk_auth::policy::AdmissionCheck;
use hrdesk_auth::{
    advance_timestamp, AccountKind, AccountProfile, AccountRecord, AccountStore, EmployeePage,
    EmployeeQuery, EmployeeStats, RoleCounts, StoreError,
};
use hrdesk_core::AccountId;

use super::query;

/// In-memory account store.
///
/// Intended for tests/dev. Every write runs its revision check, uniqueness
/// checks, role count and admission check under one write lock, and no lock
/// is held across an await point.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    /// Insertion order, oldest first.
    records: RwLock<Vec<AccountRecord>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<AccountRecord>>, StoreError> {
        self.records
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<AccountRecord>>, StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }
}

fn counts(records: &[AccountRecord], exclude: Option<AccountId>) -> RoleCounts {
    let mut counts = RoleCounts::default();
    for record in records.iter().filter(|r| Some(r.id()) != exclude) {
        counts.record(record.account.role);
    }
    counts
}

/// First unique field `candidate` collides on, email first.
fn collision(records: &[AccountRecord], candidate: &AccountRecord) -> Option<&'static str> {
    let others = || records.iter().filter(|r| r.id() != candidate.id());
    let email = candidate.account.email.to_lowercase();

    if others().any(|r| r.account.email.to_lowercase() == email) {
        return Some("email");
    }
    if others().any(|r| r.account.name == candidate.account.name) {
        return Some("name");
    }
    if let Some(mobile) = candidate.account.mobile() {
        if others().any(|r| r.account.mobile() == Some(mobile)) {
            return Some("mobile");
        }
    }
    None
}

fn admit_within(
    records: &[AccountRecord],
    candidate: &AccountRecord,
    check: AdmissionCheck,
) -> Result<(), StoreError> {
    let counts = counts(records, Some(candidate.id()));
    check(candidate.account.role, counts.admins, counts.managers)
        .into_result()
        .map_err(StoreError::Denied)
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get(&self, id: AccountId) -> Result<Option<AccountRecord>, StoreError> {
        Ok(self.read()?.iter().find(|r| r.id() == id).cloned())
    }

    async fn find_by_email_or_name(
        &self,
        email: &str,
        name: &str,
    ) -> Result<Option<AccountRecord>, StoreError> {
        let records = self.read()?;
        let email = email.to_lowercase();
        let by_email = records
            .iter()
            .find(|r| r.account.email.to_lowercase() == email);
        Ok(by_email
            .or_else(|| records.iter().find(|r| r.account.name == name))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, StoreError> {
        let email = email.to_lowercase();
        Ok(self
            .read()?
            .iter()
            .find(|r| r.account.email.to_lowercase() == email)
            .cloned())
    }

    async fn role_counts(&self, exclude: Option<AccountId>) -> Result<RoleCounts, StoreError> {
        Ok(counts(&self.read()?, exclude))
    }

    async fn insert(&self, record: AccountRecord, check: AdmissionCheck) -> Result<(), StoreError> {
        let mut records = self.write()?;

        if records.iter().any(|r| r.id() == record.id()) {
            return Err(StoreError::duplicate("id"));
        }
        if let Some(field) = collision(&records, &record) {
            return Err(StoreError::duplicate(field));
        }
        admit_within(&records, &record, check)?;

        records.push(record);
        Ok(())
    }

    async fn update(
        &self,
        record: AccountRecord,
        expected: DateTime<Utc>,
        check: AdmissionCheck,
    ) -> Result<(), StoreError> {
        let mut records = self.write()?;

        let Some(idx) = records.iter().position(|r| r.id() == record.id()) else {
            return Err(StoreError::NotFound);
        };
        if records[idx].account.updated_at != expected {
            return Err(StoreError::Stale);
        }
        if let Some(field) = collision(&records, &record) {
            return Err(StoreError::duplicate(field));
        }
        if record.account.role.is_capacity_limited() {
            admit_within(&records, &record, check)?;
        }

        records[idx] = record;
        Ok(())
    }

    async fn record_login(&self, id: AccountId, at: DateTime<Utc>) -> Result<AccountRecord, StoreError> {
        let mut records = self.write()?;
        let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
            return Err(StoreError::NotFound);
        };

        let stamped = advance_timestamp(record.account.updated_at, at);
        if let AccountProfile::Employee(profile) = &mut record.account.profile {
            profile.last_login = Some(stamped);
        }
        record.account.updated_at = stamped;
        Ok(record.clone())
    }

    async fn delete(&self, id: AccountId) -> Result<(), StoreError> {
        let mut records = self.write()?;
        let Some(idx) = records.iter().position(|r| r.id() == id) else {
            return Err(StoreError::NotFound);
        };
        records.remove(idx);
        Ok(())
    }

    async fn list(&self, kind: AccountKind) -> Result<Vec<AccountRecord>, StoreError> {
        Ok(self
            .read()?
            .iter()
            .filter(|r| r.account.kind() == kind)
            .cloned()
            .collect())
    }

    async fn query_employees(&self, query: &EmployeeQuery) -> Result<EmployeePage, StoreError> {
        let records = self.read()?;
        let employees: Vec<_> = records
            .iter()
            .filter(|r| query::matches(&r.account, query))
            .map(|r| r.account.clone())
            .collect();
        drop(records);
        Ok(query::page(employees, query))
    }

    async fn employee_stats(&self) -> Result<EmployeeStats, StoreError> {
        let records = self.read()?;
        Ok(query::stats(records.iter().map(|r| &r.account)))
    }
}
