//! Postgres-backed account store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) on `accounts_email_key` / `accounts_name_key` / `accounts_mobile_key` | `23505` | `Duplicate { field }` | Concurrent or repeated registration |
//! | Database (unique violation) on `accounts_single_admin` | `23505` | `Denied` | Second ADMIN slipped past the count |
//! | Database (other) | Any other | `Backend` | |
//! | PoolClosed / other | N/A | `Backend` | Network errors, connection failures, etc. |
//!
//! ## Role capacity
//!
//! `insert`, and every `update` that writes an ADMIN or MANAGER role, run in
//! one transaction that first takes a transaction-scoped advisory lock, then
//! counts roles, runs the admission check and writes. Two writers can
//! therefore never both observe the last free slot. The partial unique index
//! on the ADMIN role backs this up at the database level.
//!
//! ## Revisions
//!
//! `updated_at` doubles as the row revision. `update` only applies when the
//! stored value still equals the one the caller read, so a write prepared
//! from an old read can never resurrect a role or field changed since.
//! Timestamps are kept at microsecond precision to match `TIMESTAMPTZ`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row, Transaction};
use tracing::instrument;

use hrdesk_auth::policy::AdmissionCheck;
use hrdesk_auth::{
    derive_permissions, Account, AccountKind, AccountProfile, AccountRecord, AccountStatus,
    AccountStore, DepartmentStats, Denial, EmployeePage, EmployeeProfile, EmployeeQuery,
    EmployeeStats, PasswordHash, Position, Role, RoleCounts, SortField, SortOrder, StoreError,
};
use hrdesk_core::AccountId;

/// Advisory lock key serializing role-capacity decisions.
const ROLE_CAPACITY_LOCK: i64 = 0x6872_6465_736b_0001;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id            UUID PRIMARY KEY,
        kind          TEXT NOT NULL CHECK (kind IN ('user', 'employee')),
        name          TEXT NOT NULL,
        email         TEXT NOT NULL,
        password_hash TEXT,
        role          TEXT NOT NULL CHECK (role IN ('ADMIN', 'MANAGER', 'EMPLOYEE')),
        status        TEXT NOT NULL CHECK (status IN ('ACTIVE', 'INACTIVE', 'SUSPENDED')),
        mobile        TEXT,
        position      TEXT,
        salary        DOUBLE PRECISION CHECK (salary IS NULL OR salary >= 0),
        department    TEXT,
        profile_image TEXT,
        last_login    TIMESTAMPTZ,
        created_at    TIMESTAMPTZ NOT NULL,
        updated_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS accounts_email_key ON accounts (lower(email))",
    "CREATE UNIQUE INDEX IF NOT EXISTS accounts_name_key ON accounts (name)",
    "CREATE UNIQUE INDEX IF NOT EXISTS accounts_mobile_key ON accounts (mobile) WHERE mobile IS NOT NULL",
    "CREATE UNIQUE INDEX IF NOT EXISTS accounts_single_admin ON accounts (role) WHERE role = 'ADMIN'",
    "CREATE INDEX IF NOT EXISTS accounts_kind_created_idx ON accounts (kind, created_at)",
];

const COLUMNS: &str = "id, kind, name, email, password_hash, role, status, mobile, position, \
                       salary, department, profile_image, last_login, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresAccountStore {
    pool: Arc<PgPool>,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Create the table and indexes if they are missing. Idempotent.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(*statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }

    async fn fetch_record(
        &self,
        operation: &str,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<Option<AccountRecord>, StoreError> {
        let row = query
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

/// Take the capacity lock, count roles (excluding `candidate`) and run `check`.
async fn admit_in_transaction(
    tx: &mut Transaction<'static, Postgres>,
    candidate: &AccountRecord,
    check: AdmissionCheck,
) -> Result<(), StoreError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(ROLE_CAPACITY_LOCK)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("advisory_lock", e))?;

    let counts = count_roles(&mut **tx, Some(candidate.id())).await?;
    check(candidate.account.role, counts.admins, counts.managers)
        .into_result()
        .map_err(StoreError::Denied)
}

async fn count_roles<'e, E>(executor: E, exclude: Option<AccountId>) -> Result<RoleCounts, StoreError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE role = 'ADMIN')   AS admins,
            COUNT(*) FILTER (WHERE role = 'MANAGER') AS managers
        FROM accounts
        WHERE $1::uuid IS NULL OR id <> $1
        "#,
    )
    .bind(exclude.map(|id| *id.as_uuid()))
    .fetch_one(executor)
    .await
    .map_err(|e| map_sqlx_error("count_roles", e))?;

    let admins: i64 = row.try_get("admins").map_err(|e| map_sqlx_error("count_roles", e))?;
    let managers: i64 = row.try_get("managers").map_err(|e| map_sqlx_error("count_roles", e))?;
    Ok(RoleCounts {
        admins: admins as usize,
        managers: managers as usize,
    })
}

/// Append the employee filters shared by the page and count queries.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &EmployeeQuery) {
    qb.push(" WHERE kind = 'employee'");

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        qb.push(" AND (name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR email ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    if let Some(position) = query.position {
        qb.push(" AND position = ");
        qb.push_bind(position.as_str());
    }
    if let Some(min) = query.min_salary {
        qb.push(" AND salary >= ");
        qb.push_bind(min);
    }
    if let Some(max) = query.max_salary {
        qb.push(" AND salary <= ");
        qb.push_bind(max);
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::CreatedAt => "created_at",
        SortField::Name => "name",
        SortField::Email => "email",
        SortField::Salary => "salary",
        SortField::Position => "position",
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn get(&self, id: AccountId) -> Result<Option<AccountRecord>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM accounts WHERE id = $1");
        self.fetch_record("get", sqlx::query(&sql).bind(*id.as_uuid()))
            .await
    }

    #[instrument(skip(self, email, name), err)]
    async fn find_by_email_or_name(
        &self,
        email: &str,
        name: &str,
    ) -> Result<Option<AccountRecord>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM accounts \
             WHERE lower(email) = lower($1) OR name = $2 \
             ORDER BY (lower(email) = lower($1)) DESC \
             LIMIT 1"
        );
        self.fetch_record("find_by_email_or_name", sqlx::query(&sql).bind(email).bind(name))
            .await
    }

    #[instrument(skip(self, email), err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM accounts WHERE lower(email) = lower($1)");
        self.fetch_record("find_by_email", sqlx::query(&sql).bind(email))
            .await
    }

    #[instrument(skip(self), err)]
    async fn role_counts(&self, exclude: Option<AccountId>) -> Result<RoleCounts, StoreError> {
        count_roles(&*self.pool, exclude).await
    }

    #[instrument(
        skip(self, record, check),
        fields(account_id = %record.id(), role = %record.account.role),
        err
    )]
    async fn insert(&self, record: AccountRecord, check: AdmissionCheck) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        admit_in_transaction(&mut tx, &record, check).await?;

        let row = AccountRow::from(&record);
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, kind, name, email, password_hash, role, status, mobile, position,
                salary, department, profile_image, last_login, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(row.id)
        .bind(row.kind)
        .bind(row.name)
        .bind(row.email)
        .bind(row.password_hash)
        .bind(row.role)
        .bind(row.status)
        .bind(row.mobile)
        .bind(row.position)
        .bind(row.salary)
        .bind(row.department)
        .bind(row.profile_image)
        .bind(row.last_login)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_account", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self, record, check), fields(account_id = %record.id()), err)]
    async fn update(
        &self,
        record: AccountRecord,
        expected: DateTime<Utc>,
        check: AdmissionCheck,
    ) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;
        if record.account.role.is_capacity_limited() {
            admit_in_transaction(&mut tx, &record, check).await?;
        }

        let row = AccountRow::from(&record);
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                name = $2, email = $3, password_hash = $4, role = $5, status = $6,
                mobile = $7, position = $8, salary = $9, department = $10,
                profile_image = $11, last_login = $12, updated_at = $13
            WHERE id = $1 AND updated_at = $14
            "#,
        )
        .bind(row.id)
        .bind(row.name)
        .bind(row.email)
        .bind(row.password_hash)
        .bind(row.role)
        .bind(row.status)
        .bind(row.mobile)
        .bind(row.position)
        .bind(row.salary)
        .bind(row.department)
        .bind(row.profile_image)
        .bind(row.last_login)
        .bind(row.updated_at)
        .bind(expected)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_account", e))?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT 1 FROM accounts WHERE id = $1")
                .bind(row.id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_account", e))?
                .is_some();
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(if exists { StoreError::Stale } else { StoreError::NotFound });
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self, at), fields(account_id = %id), err)]
    async fn record_login(&self, id: AccountId, at: DateTime<Utc>) -> Result<AccountRecord, StoreError> {
        let sql = format!(
            "UPDATE accounts SET \
                 updated_at = GREATEST($2, updated_at + interval '1 microsecond'), \
                 last_login = CASE WHEN kind = 'employee' \
                     THEN GREATEST($2, updated_at + interval '1 microsecond') \
                     ELSE last_login END \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        self.fetch_record(
            "record_login",
            sqlx::query(&sql).bind(*id.as_uuid()).bind(at.trunc_subsecs(6)),
        )
        .await?
        .ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    async fn delete(&self, id: AccountId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_account", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list(&self, kind: AccountKind) -> Result<Vec<AccountRecord>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM accounts WHERE kind = $1 ORDER BY created_at ASC, id ASC");
        let rows = sqlx::query(&sql)
            .bind(kind.as_str())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_accounts", e))?;

        rows.iter().map(record_from_row).collect()
    }

    #[instrument(skip(self, query), fields(page = query.page, limit = query.limit), err)]
    async fn query_employees(&self, query: &EmployeeQuery) -> Result<EmployeePage, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM accounts");
        push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_employees", e))?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM accounts"));
        push_filters(&mut select, query);
        let direction = match query.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        select.push(format!(
            " ORDER BY {} {direction}, id ASC",
            sort_column(query.sort_by)
        ));
        select.push(" LIMIT ");
        select.push_bind(i64::from(query.limit));
        select.push(" OFFSET ");
        select.push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));

        let rows = select
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_employees", e))?;

        let employees = rows
            .iter()
            .map(|row| record_from_row(row).map(AccountRecord::into_account))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EmployeePage::new(employees, query, total.max(0) as u64))
    }

    #[instrument(skip(self), err)]
    async fn employee_stats(&self) -> Result<EmployeeStats, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                position,
                COUNT(*)                    AS count,
                COALESCE(SUM(salary), 0)    AS total_salary,
                COALESCE(AVG(salary), 0)    AS average_salary
            FROM accounts
            WHERE kind = 'employee'
            GROUP BY position
            ORDER BY count DESC, position ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("employee_stats", e))?;

        let mut stats = EmployeeStats::default();
        for row in rows {
            let name: String = row.try_get("position").map_err(|e| map_sqlx_error("employee_stats", e))?;
            let count: i64 = row.try_get("count").map_err(|e| map_sqlx_error("employee_stats", e))?;
            let total: f64 = row
                .try_get("total_salary")
                .map_err(|e| map_sqlx_error("employee_stats", e))?;
            let average: f64 = row
                .try_get("average_salary")
                .map_err(|e| map_sqlx_error("employee_stats", e))?;

            stats.total_employees += count as u64;
            stats.total_salary += total;
            stats.departments.push(DepartmentStats {
                name,
                count: count as u64,
                average_salary: average,
            });
        }
        Ok(stats)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────────────────────────

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                match db_err.constraint() {
                    Some("accounts_email_key") => return StoreError::duplicate("email"),
                    Some("accounts_name_key") => return StoreError::duplicate("name"),
                    Some("accounts_mobile_key") => return StoreError::duplicate("mobile"),
                    Some("accounts_pkey") => return StoreError::duplicate("id"),
                    Some("accounts_single_admin") => {
                        return StoreError::Denied(Denial {
                            role: Role::Admin,
                            reason: "admin already exists",
                        });
                    }
                    _ => {}
                }
            }
            StoreError::backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct AccountRow {
    id: uuid::Uuid,
    kind: String,
    name: String,
    email: String,
    password_hash: Option<String>,
    role: String,
    status: String,
    mobile: Option<String>,
    position: Option<String>,
    salary: Option<f64>,
    department: Option<String>,
    profile_image: Option<String>,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for AccountRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AccountRow {
            id: row.try_get("id")?,
            kind: row.try_get("kind")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: row.try_get("role")?,
            status: row.try_get("status")?,
            mobile: row.try_get("mobile")?,
            position: row.try_get("position")?,
            salary: row.try_get("salary")?,
            department: row.try_get("department")?,
            profile_image: row.try_get("profile_image")?,
            last_login: row.try_get("last_login")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<&AccountRecord> for AccountRow {
    fn from(record: &AccountRecord) -> Self {
        let account = &record.account;
        let employee = account.profile.as_employee();
        AccountRow {
            id: *account.id.as_uuid(),
            kind: account.kind().as_str().to_string(),
            name: account.name.clone(),
            email: account.email.clone(),
            password_hash: record.secret.as_ref().map(|s| s.as_str().to_string()),
            role: account.role.as_str().to_string(),
            status: account.status.as_str().to_string(),
            mobile: employee.map(|e| e.mobile.clone()),
            position: employee.map(|e| e.position.as_str().to_string()),
            salary: employee.map(|e| e.salary),
            department: employee.and_then(|e| e.department.clone()),
            profile_image: employee.and_then(|e| e.profile_image.clone()),
            last_login: employee.and_then(|e| e.last_login),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

impl TryFrom<AccountRow> for AccountRecord {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| StoreError::backend(format!("corrupt account row {}: {what}", row.id));

        let role: Role = row.role.parse().map_err(|_| corrupt("role"))?;
        let status: AccountStatus = row.status.parse().map_err(|_| corrupt("status"))?;
        let profile = match row.kind.as_str() {
            "user" => AccountProfile::User,
            "employee" => {
                let position: Position = row
                    .position
                    .as_deref()
                    .ok_or_else(|| corrupt("position"))?
                    .parse()
                    .map_err(|_| corrupt("position"))?;
                AccountProfile::Employee(EmployeeProfile {
                    mobile: row.mobile.clone().ok_or_else(|| corrupt("mobile"))?,
                    position,
                    salary: row.salary.ok_or_else(|| corrupt("salary"))?,
                    department: row.department.clone(),
                    last_login: row.last_login,
                    profile_image: row.profile_image.clone(),
                })
            }
            _ => return Err(corrupt("kind")),
        };

        Ok(AccountRecord {
            account: Account {
                id: AccountId::from_uuid(row.id),
                name: row.name,
                email: row.email,
                role,
                status,
                permissions: derive_permissions(role),
                profile,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            secret: row.password_hash.map(PasswordHash::from_phc),
        })
    }
}

fn record_from_row(row: &PgRow) -> Result<AccountRecord, StoreError> {
    let row = AccountRow::from_row(row).map_err(|e| map_sqlx_error("decode_account", e))?;
    AccountRecord::try_from(row)
}
