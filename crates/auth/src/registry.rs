//! Identity registry: the single choke point for every account write.
//!
//! Each creation path runs validation, the uniqueness lookup, the role policy
//! and secret protection before anything is persisted. The store re-runs the
//! admission check inside its own critical section, so the count taken here
//! is only a fast path.

use chrono::{SubsecRound, Utc};
use tracing::instrument;

use hrdesk_core::{AccountId, DomainError, DomainResult, FieldErrors};

use crate::account::{Account, AccountDraft, AccountKind, AccountPatch, AccountRecord};
use crate::credential::CredentialStore;
use crate::policy::{admit, admit_counts, derive_permissions};

/// Read-modify-write attempts before a contended update gives up.
const UPDATE_ATTEMPTS: usize = 3;
use crate::store::{
    advance_timestamp, AccountStore, EmployeePage, EmployeeQuery, EmployeeStats, StoreError,
};
use crate::{validate, AccountStatus};

#[derive(Debug, Clone)]
pub struct IdentityRegistry<S> {
    store: S,
    credentials: CredentialStore,
}

impl<S> IdentityRegistry<S>
where
    S: AccountStore,
{
    pub fn new(store: S, credentials: CredentialStore) -> Self {
        Self { store, credentials }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate, admit and persist a new account.
    #[instrument(skip(self, draft), err)]
    pub async fn create(&self, draft: AccountDraft) -> DomainResult<Account> {
        let valid = validate::draft(&draft)?;

        if let Some(existing) = self
            .store
            .find_by_email_or_name(&valid.email, &valid.name)
            .await?
        {
            let field = if existing.account.email == valid.email {
                "email"
            } else {
                "name"
            };
            return Err(StoreError::duplicate(field).into());
        }

        if valid.role.is_capacity_limited() {
            let counts = self.store.role_counts(None).await?;
            admit_counts(valid.role, counts).into_result()?;
        }

        let secret = match valid.password {
            Some(password) => Some(self.credentials.protect_blocking(password).await?),
            None => None,
        };

        let now = Utc::now().trunc_subsecs(6);
        let account = Account {
            id: AccountId::new(),
            name: valid.name,
            email: valid.email,
            role: valid.role,
            status: AccountStatus::Active,
            permissions: derive_permissions(valid.role),
            profile: valid.profile,
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert(
                AccountRecord {
                    account: account.clone(),
                    secret,
                },
                admit,
            )
            .await?;

        tracing::info!(
            account_id = %account.id,
            kind = account.kind().as_str(),
            role = %account.role,
            "account created"
        );
        Ok(account)
    }

    pub async fn find_by_id(&self, id: AccountId) -> DomainResult<Account> {
        self.store
            .get(id)
            .await?
            .map(AccountRecord::into_account)
            .ok_or(DomainError::NotFound)
    }

    /// Email comparison is case-insensitive.
    pub async fn find_by_email_or_name(&self, email: &str, name: &str) -> DomainResult<Option<Account>> {
        let email = email.trim().to_lowercase();
        let found = self.store.find_by_email_or_name(&email, name.trim()).await?;
        Ok(found.map(AccountRecord::into_account))
    }

    /// Apply a partial update. Unknown ids fail with `NotFound`.
    ///
    /// The write only lands if the record is unchanged since it was read;
    /// otherwise the patch is re-applied to a fresh copy.
    #[instrument(skip(self, patch), fields(account_id = %id), err)]
    pub async fn update(&self, id: AccountId, patch: AccountPatch) -> DomainResult<Account> {
        for attempt in 1..=UPDATE_ATTEMPTS {
            let Some(mut record) = self.store.get(id).await? else {
                return Err(DomainError::NotFound);
            };

            let valid = validate::patch(&patch, record.account.kind())?;

            let promotion = valid
                .role
                .filter(|role| *role != record.account.role && role.is_capacity_limited());
            if let Some(role) = promotion {
                let counts = self.store.role_counts(Some(id)).await?;
                admit_counts(role, counts).into_result()?;
            }

            let expected = record.account.updated_at;
            valid.apply_to(&mut record.account);
            record.account.permissions = derive_permissions(record.account.role);
            record.account.updated_at = advance_timestamp(expected, Utc::now());

            let account = record.account.clone();
            match self.store.update(record, expected, admit).await {
                Ok(()) => {
                    tracing::info!(account_id = %id, role = %account.role, status = %account.status, "account updated");
                    return Ok(account);
                }
                Err(StoreError::Stale) => {
                    tracing::debug!(account_id = %id, attempt, "stale account write, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::Stale.into())
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: AccountId) -> DomainResult<()> {
        self.store.delete(id).await?;
        tracing::info!(account_id = %id, "account deleted");
        Ok(())
    }

    /// Check an email/password pair.
    ///
    /// Unknown email, wrong password, missing secret and inactive status all
    /// fail with the same `InvalidCredential`, after the same amount of work.
    #[instrument(skip(self, email, password), err)]
    pub async fn authenticate(&self, email: &str, password: &str) -> DomainResult<Account> {
        let email = email.trim().to_lowercase();
        let record = self.store.find_by_email(&email).await?;

        let secret = record.as_ref().and_then(|r| r.secret.clone());
        let matched = self
            .credentials
            .verify_blocking(password.to_string(), secret)
            .await;

        let mut record = match record {
            Some(record) if matched && record.account.is_active() => record,
            _ => return Err(DomainError::InvalidCredential),
        };

        if record.account.kind() == AccountKind::Employee {
            record = match self.store.record_login(record.id(), Utc::now()).await {
                Ok(stamped) => stamped,
                Err(StoreError::NotFound) => return Err(DomainError::InvalidCredential),
                Err(e) => return Err(e.into()),
            };
        }

        tracing::debug!(account_id = %record.account.id, "authenticated");
        Ok(record.into_account())
    }

    pub async fn list_users(&self) -> DomainResult<Vec<Account>> {
        let records = self.store.list(AccountKind::User).await?;
        Ok(records.into_iter().map(AccountRecord::into_account).collect())
    }

    pub async fn list_employees(&self, query: &EmployeeQuery) -> DomainResult<EmployeePage> {
        check_query(query)?;
        Ok(self.store.query_employees(query).await?)
    }

    pub async fn employee_stats(&self) -> DomainResult<EmployeeStats> {
        Ok(self.store.employee_stats().await?)
    }
}

fn check_query(query: &EmployeeQuery) -> DomainResult<()> {
    let mut errors = FieldErrors::new();
    if query.page == 0 {
        errors.add("page", "Page must be at least 1");
    }
    if !(1..=EmployeeQuery::MAX_LIMIT).contains(&query.limit) {
        errors.add("limit", "Limit must be between 1 and 100");
    }
    if let (Some(min), Some(max)) = (query.min_salary, query.max_salary) {
        if min > max {
            errors.add("min_salary", "Minimum salary cannot exceed maximum salary");
        }
    }
    errors.into_result()
}
