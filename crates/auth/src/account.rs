//! Account model: the two account kinds, their drafts and partial updates.
//!
//! `Account` is the public, secret-free representation. The password hash
//! only ever travels inside [`AccountRecord`], which is shared between the
//! registry and the store and is never serialized.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hrdesk_core::{AccountId, DomainError};

use crate::credential::PasswordHash;
use crate::{AccountStatus, PermissionSet, Role};

// ─────────────────────────────────────────────────────────────────────────────
// Position
// ─────────────────────────────────────────────────────────────────────────────

/// Fixed job titles an employee record may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "Software Engineer")]
    SoftwareEngineer,
    #[serde(rename = "Project Manager")]
    ProjectManager,
    #[serde(rename = "HR Manager")]
    HrManager,
    #[serde(rename = "Sales Representative")]
    SalesRepresentative,
    #[serde(rename = "Marketing Specialist")]
    MarketingSpecialist,
    Admin,
    Manager,
}

impl Position {
    pub const ALL: [Position; 7] = [
        Position::SoftwareEngineer,
        Position::ProjectManager,
        Position::HrManager,
        Position::SalesRepresentative,
        Position::MarketingSpecialist,
        Position::Admin,
        Position::Manager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::SoftwareEngineer => "Software Engineer",
            Position::ProjectManager => "Project Manager",
            Position::HrManager => "HR Manager",
            Position::SalesRepresentative => "Sales Representative",
            Position::MarketingSpecialist => "Marketing Specialist",
            Position::Admin => "Admin",
            Position::Manager => "Manager",
        }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Position::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| DomainError::validation("position", "Invalid position selected"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Account
// ─────────────────────────────────────────────────────────────────────────────

/// Which attribute set an account carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    User,
    Employee,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::User => "user",
            AccountKind::Employee => "employee",
        }
    }
}

/// Attributes only employee records carry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeProfile {
    pub mobile: String,
    pub position: Position,
    pub salary: f64,
    pub department: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AccountProfile {
    User,
    Employee(EmployeeProfile),
}

impl AccountProfile {
    pub fn kind(&self) -> AccountKind {
        match self {
            AccountProfile::User => AccountKind::User,
            AccountProfile::Employee(_) => AccountKind::Employee,
        }
    }

    pub fn as_employee(&self) -> Option<&EmployeeProfile> {
        match self {
            AccountProfile::Employee(profile) => Some(profile),
            AccountProfile::User => None,
        }
    }
}

/// An authenticated principal, as seen by everything outside the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub permissions: PermissionSet,
    #[serde(flatten)]
    pub profile: AccountProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn kind(&self) -> AccountKind {
        self.profile.kind()
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    pub fn mobile(&self) -> Option<&str> {
        self.profile.as_employee().map(|e| e.mobile.as_str())
    }
}

/// Stored form of an account: the account plus its secret.
///
/// Employee records created without a password have no secret and can never
/// authenticate.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRecord {
    pub account: Account,
    pub secret: Option<PasswordHash>,
}

impl AccountRecord {
    pub fn id(&self) -> AccountId {
        self.account.id
    }

    pub fn into_account(self) -> Account {
        self.account
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Drafts (unvalidated caller input)
// ─────────────────────────────────────────────────────────────────────────────

/// Input for self-registration and admin-created users.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role.as_str().to_string());
        self
    }
}

/// Input for employee record creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEmployee {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub salary: Option<f64>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl NewEmployee {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        mobile: impl Into<String>,
        position: Position,
        salary: f64,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            mobile: mobile.into(),
            position: position.as_str().to_string(),
            salary: Some(salary),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role.as_str().to_string());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// Any account-creation input.
#[derive(Debug, Clone)]
pub enum AccountDraft {
    User(NewUser),
    Employee(NewEmployee),
}

impl From<NewUser> for AccountDraft {
    fn from(value: NewUser) -> Self {
        AccountDraft::User(value)
    }
}

impl From<NewEmployee> for AccountDraft {
    fn from(value: NewEmployee) -> Self {
        AccountDraft::Employee(value)
    }
}

/// Partial update. Omitted fields are left untouched.
///
/// There is intentionally no permissions field: permissions are recomputed
/// from the role on every write.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub salary: Option<f64>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl AccountPatch {
    pub fn role(role: Role) -> Self {
        Self {
            role: Some(role.as_str().to_string()),
            ..Default::default()
        }
    }

    pub fn status(status: AccountStatus) -> Self {
        Self {
            status: Some(status.as_str().to_string()),
            ..Default::default()
        }
    }

    /// Whether the patch touches role or status.
    pub fn changes_access(&self) -> bool {
        self.role.is_some() || self.status.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(profile: AccountProfile) -> Account {
        let now = Utc::now();
        Account {
            id: AccountId::new(),
            name: "frank".to_string(),
            email: "frank@example.com".to_string(),
            role: Role::Employee,
            status: AccountStatus::Active,
            permissions: PermissionSet::default(),
            profile,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn user_json_is_flat_and_secret_free() {
        let json = serde_json::to_value(sample(AccountProfile::User)).unwrap();
        assert_eq!(json["kind"], "user");
        assert_eq!(json["role"], "EMPLOYEE");
        assert_eq!(json["status"], "ACTIVE");
        assert_eq!(json["permissions"]["can_manage_users"], false);
        assert!(json.get("password").is_none());
        assert!(json.get("secret").is_none());
    }

    #[test]
    fn employee_json_carries_profile_fields() {
        let profile = EmployeeProfile {
            mobile: "0123456789".to_string(),
            position: Position::HrManager,
            salary: 4200.0,
            department: Some("People".to_string()),
            last_login: None,
            profile_image: None,
        };
        let json = serde_json::to_value(sample(AccountProfile::Employee(profile))).unwrap();
        assert_eq!(json["kind"], "employee");
        assert_eq!(json["position"], "HR Manager");
        assert_eq!(json["mobile"], "0123456789");
    }

    #[test]
    fn position_parses_display_titles() {
        for position in Position::ALL {
            assert_eq!(position.as_str().parse::<Position>().unwrap(), position);
        }
        assert!("Janitor".parse::<Position>().is_err());
    }

    #[test]
    fn patch_ignores_permission_fields() {
        let patch: AccountPatch = serde_json::from_value(serde_json::json!({
            "name": "renamed",
            "permissions": { "can_manage_users": true },
        }))
        .unwrap();
        assert_eq!(patch.name.as_deref(), Some("renamed"));
        assert!(!patch.changes_access());
    }
}
