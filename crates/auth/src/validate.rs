//! Explicit input validation.
//!
//! Every check for a payload runs, and all failures are reported together as
//! one `Validation` error keyed by field name.

use hrdesk_core::{DomainError, DomainResult, FieldErrors};

use crate::account::{
    Account, AccountDraft, AccountKind, AccountPatch, AccountProfile, EmployeeProfile, NewEmployee,
    NewUser, Position,
};
use crate::{AccountStatus, Role};

const PASSWORD_SPECIALS: &[char] = &['@', '$', '!', '%', '*', '?', '&'];

/// A creation draft that passed validation, normalized and typed.
#[derive(Debug, Clone)]
pub struct ValidDraft {
    pub name: String,
    /// Trimmed and lower-cased.
    pub email: String,
    pub role: Role,
    pub password: Option<String>,
    pub profile: AccountProfile,
}

/// Employee-only changes carried by a patch.
#[derive(Debug, Clone, Default)]
pub struct EmployeeChanges {
    pub mobile: Option<String>,
    pub position: Option<Position>,
    pub salary: Option<f64>,
    /// `Some(None)` clears the department.
    pub department: Option<Option<String>>,
    /// `Some(None)` clears the image reference.
    pub profile_image: Option<Option<String>>,
}

/// A patch that passed validation.
#[derive(Debug, Clone, Default)]
pub struct ValidPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    pub employee: EmployeeChanges,
}

impl ValidPatch {
    /// Copy the supplied fields onto `account`. Permissions are not touched.
    pub fn apply_to(self, account: &mut Account) {
        if let Some(name) = self.name {
            account.name = name;
        }
        if let Some(email) = self.email {
            account.email = email;
        }
        if let Some(role) = self.role {
            account.role = role;
        }
        if let Some(status) = self.status {
            account.status = status;
        }
        if let AccountProfile::Employee(profile) = &mut account.profile {
            let changes = self.employee;
            if let Some(mobile) = changes.mobile {
                profile.mobile = mobile;
            }
            if let Some(position) = changes.position {
                profile.position = position;
            }
            if let Some(salary) = changes.salary {
                profile.salary = salary;
            }
            if let Some(department) = changes.department {
                profile.department = department;
            }
            if let Some(profile_image) = changes.profile_image {
                profile.profile_image = profile_image;
            }
        }
    }
}

pub fn draft(draft: &AccountDraft) -> DomainResult<ValidDraft> {
    match draft {
        AccountDraft::User(user) => new_user(user),
        AccountDraft::Employee(employee) => new_employee(employee),
    }
}

pub fn new_user(input: &NewUser) -> DomainResult<ValidDraft> {
    let mut errors = FieldErrors::new();

    let name = user_name(&input.name, &mut errors);
    let email = email(&input.email, &mut errors);
    password(&input.password, &mut errors);
    let role = optional_role(input.role.as_deref(), &mut errors);

    errors.into_result()?;
    Ok(ValidDraft {
        name,
        email,
        role,
        password: Some(input.password.clone()),
        profile: AccountProfile::User,
    })
}

pub fn new_employee(input: &NewEmployee) -> DomainResult<ValidDraft> {
    let mut errors = FieldErrors::new();

    let name = employee_name(&input.name, &mut errors);
    let email = email(&input.email, &mut errors);
    let mobile = mobile(&input.mobile, &mut errors);
    let position = required_position(&input.position, &mut errors);
    let salary = match input.salary {
        Some(value) => salary(value, &mut errors),
        None => {
            errors.add("salary", "Salary is required");
            0.0
        }
    };
    if let Some(secret) = &input.password {
        password(secret, &mut errors);
    }
    let role = optional_role(input.role.as_deref(), &mut errors);

    errors.into_result()?;
    let Some(position) = position else {
        return Err(DomainError::validation("position", "Position is required"));
    };

    Ok(ValidDraft {
        name,
        email,
        role,
        password: input.password.clone(),
        profile: AccountProfile::Employee(EmployeeProfile {
            mobile,
            position,
            salary,
            department: trimmed_optional(input.department.as_deref()),
            last_login: None,
            profile_image: trimmed_optional(input.profile_image.as_deref()),
        }),
    })
}

/// Validate only the fields a patch supplies, with the rules of `kind`.
pub fn patch(input: &AccountPatch, kind: AccountKind) -> DomainResult<ValidPatch> {
    let mut errors = FieldErrors::new();
    let mut valid = ValidPatch::default();

    if let Some(raw) = &input.name {
        valid.name = Some(match kind {
            AccountKind::User => user_name(raw, &mut errors),
            AccountKind::Employee => employee_name(raw, &mut errors),
        });
    }
    if let Some(raw) = &input.email {
        valid.email = Some(email(raw, &mut errors));
    }
    if let Some(raw) = &input.role {
        match raw.parse::<Role>() {
            Ok(role) => valid.role = Some(role),
            Err(_) => errors.add("role", "Invalid role"),
        }
    }
    if let Some(raw) = &input.status {
        match raw.parse::<AccountStatus>() {
            Ok(status) => valid.status = Some(status),
            Err(_) => errors.add("status", "Invalid status"),
        }
    }

    let mut changes = EmployeeChanges::default();
    if let Some(raw) = &input.mobile {
        changes.mobile = Some(mobile(raw, &mut errors));
    }
    if let Some(raw) = &input.position {
        changes.position = required_position(raw, &mut errors);
    }
    if let Some(value) = input.salary {
        changes.salary = Some(salary(value, &mut errors));
    }
    // A blank string clears the field.
    changes.department = input.department.as_deref().map(|raw| trimmed_optional(Some(raw)));
    changes.profile_image = input.profile_image.as_deref().map(|raw| trimmed_optional(Some(raw)));

    if kind == AccountKind::User {
        for (field, present) in [
            ("mobile", input.mobile.is_some()),
            ("position", input.position.is_some()),
            ("salary", input.salary.is_some()),
            ("department", input.department.is_some()),
            ("profile_image", input.profile_image.is_some()),
        ] {
            if present {
                errors.add(field, "Field does not apply to user accounts");
            }
        }
    }

    errors.into_result()?;
    valid.employee = changes;
    Ok(valid)
}

// ─────────────────────────────────────────────────────────────────────────────
// Field rules
// ─────────────────────────────────────────────────────────────────────────────

fn user_name(raw: &str, errors: &mut FieldErrors) -> String {
    let name = raw.trim();
    if name.is_empty() {
        errors.add("name", "name is required");
        return String::new();
    }
    let len = name.chars().count();
    if !(3..=20).contains(&len) {
        errors.add("name", "name must be between 3 and 20 characters");
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        errors.add("name", "name can only contain letters, numbers, and underscores");
    }
    name.to_string()
}

fn employee_name(raw: &str, errors: &mut FieldErrors) -> String {
    let name = raw.trim();
    if name.is_empty() {
        errors.add("name", "Name is required");
        return String::new();
    }
    if !(2..=50).contains(&name.chars().count()) {
        errors.add("name", "Name must be between 2 and 50 characters");
    }
    name.to_string()
}

fn email(raw: &str, errors: &mut FieldErrors) -> String {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(&email) {
        errors.add("email", "Invalid email format");
    }
    email
}

fn password(raw: &str, errors: &mut FieldErrors) {
    if raw.is_empty() {
        errors.add("password", "Password is required");
        return;
    }
    if raw.chars().count() < 6 {
        errors.add("password", "Password must be at least 6 characters long");
    }
    let has_lower = raw.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = raw.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = raw.chars().any(|c| c.is_ascii_digit());
    let has_special = raw.chars().any(|c| PASSWORD_SPECIALS.contains(&c));
    let only_allowed = raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(&c));
    if !(has_lower && has_upper && has_digit && has_special && only_allowed) {
        errors.add(
            "password",
            "Password must include uppercase, lowercase, number, and special character",
        );
    }
}

fn mobile(raw: &str, errors: &mut FieldErrors) -> String {
    let mobile = raw.trim();
    if mobile.is_empty() {
        errors.add("mobile", "Mobile number is required");
    } else if mobile.len() != 10 || !mobile.bytes().all(|b| b.is_ascii_digit()) {
        errors.add("mobile", "Please enter a valid 10-digit mobile number");
    }
    mobile.to_string()
}

fn required_position(raw: &str, errors: &mut FieldErrors) -> Option<Position> {
    if raw.trim().is_empty() {
        errors.add("position", "Position is required");
        return None;
    }
    match raw.parse::<Position>() {
        Ok(position) => Some(position),
        Err(_) => {
            errors.add("position", "Invalid position selected");
            None
        }
    }
}

fn salary(value: f64, errors: &mut FieldErrors) -> f64 {
    if !value.is_finite() || value < 0.0 {
        errors.add("salary", "Salary must be a positive number");
    }
    value
}

fn optional_role(raw: Option<&str>, errors: &mut FieldErrors) -> Role {
    match raw {
        None => Role::default(),
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            errors.add("role", "Invalid role");
            Role::default()
        }),
    }
}

fn trimmed_optional(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `local@domain.tld`, with an alphabetic top-level label of at least two chars.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
    {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld = labels[labels.len() - 1];
    labels_ok && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(err: DomainError) -> FieldErrors {
        match err {
            DomainError::Validation(fields) => fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_user_is_normalized() {
        let valid = new_user(&NewUser::new("alice_1", "  Alice@Example.COM ", "Str0ng!pw")).unwrap();
        assert_eq!(valid.email, "alice@example.com");
        assert_eq!(valid.role, Role::Employee);
        assert_eq!(valid.profile, AccountProfile::User);
    }

    #[test]
    fn all_failing_fields_are_reported_together() {
        let input = NewUser {
            name: "a!".to_string(),
            email: "nope".to_string(),
            password: "short".to_string(),
            role: Some("ROOT".to_string()),
        };
        let errors = fields(new_user(&input).unwrap_err());
        for field in ["name", "email", "password", "role"] {
            assert!(errors.contains(field), "missing {field}");
        }
        assert_eq!(errors.get("name").unwrap().len(), 2);
    }

    #[test]
    fn password_needs_every_character_class() {
        for weak in ["alllower1!", "ALLUPPER1!", "NoDigits!!", "NoSpecial1", "Bad#Char1"] {
            let errors = fields(new_user(&NewUser::new("bob", "bob@example.com", weak)).unwrap_err());
            assert!(errors.contains("password"), "{weak} should be rejected");
        }
    }

    #[test]
    fn employee_requires_mobile_position_and_salary() {
        let input = NewEmployee {
            name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
            ..Default::default()
        };
        let errors = fields(new_employee(&input).unwrap_err());
        assert_eq!(errors.get("mobile").unwrap(), ["Mobile number is required"]);
        assert_eq!(errors.get("position").unwrap(), ["Position is required"]);
        assert_eq!(errors.get("salary").unwrap(), ["Salary is required"]);
    }

    #[test]
    fn employee_field_shapes() {
        let mut input = NewEmployee::new("Gi", "g@example.org", "12345", Position::Admin, -1.0);
        input.position = "Astronaut".to_string();
        let errors = fields(new_employee(&input).unwrap_err());
        assert!(errors.contains("mobile"));
        assert!(errors.contains("salary"));
        assert_eq!(errors.get("position").unwrap(), ["Invalid position selected"]);
        assert!(!errors.contains("name"));
    }

    #[test]
    fn employee_password_is_optional_but_checked() {
        let input = NewEmployee::new("Linus", "linus@example.com", "0123456789", Position::SoftwareEngineer, 100.0);
        assert!(new_employee(&input).unwrap().password.is_none());

        let errors = fields(new_employee(&input.with_password("weak")).unwrap_err());
        assert!(errors.contains("password"));
    }

    #[test]
    fn patch_rejects_employee_fields_on_users() {
        let patch_input = AccountPatch {
            salary: Some(10.0),
            ..Default::default()
        };
        let errors = fields(patch(&patch_input, AccountKind::User).unwrap_err());
        assert!(errors.contains("salary"));
        assert!(patch(&patch_input, AccountKind::Employee).is_ok());
    }

    #[test]
    fn blank_department_in_patch_clears_it() {
        let mut account = Account {
            id: hrdesk_core::AccountId::new(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            role: Role::Employee,
            status: AccountStatus::Active,
            permissions: crate::derive_permissions(Role::Employee),
            profile: AccountProfile::Employee(EmployeeProfile {
                mobile: "0123456789".to_string(),
                position: Position::SoftwareEngineer,
                salary: 100.0,
                department: Some("R&D".to_string()),
                last_login: None,
                profile_image: Some("ada.png".to_string()),
            }),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let blank = AccountPatch {
            department: Some("   ".to_string()),
            ..Default::default()
        };
        patch(&blank, AccountKind::Employee).unwrap().apply_to(&mut account);
        let profile = account.profile.as_employee().unwrap();
        assert_eq!(profile.department, None);
        assert_eq!(profile.profile_image.as_deref(), Some("ada.png"));

        let errors = fields(patch(&blank, AccountKind::User).unwrap_err());
        assert!(errors.contains("department"));
    }

    #[test]
    fn patch_validates_only_supplied_fields() {
        let valid = patch(&AccountPatch::role(Role::Manager), AccountKind::User).unwrap();
        assert_eq!(valid.role, Some(Role::Manager));
        assert!(valid.name.is_none() && valid.email.is_none());

        let bad = AccountPatch {
            status: Some("GONE".to_string()),
            email: Some("x@".to_string()),
            ..Default::default()
        };
        let errors = fields(patch(&bad, AccountKind::Employee).unwrap_err());
        assert!(errors.contains("status") && errors.contains("email"));
    }

    #[test]
    fn email_shapes() {
        for ok in ["a@x.com", "first.last+tag@mail.example.org", "u_1@sub-domain.io"] {
            assert!(is_valid_email(ok), "{ok}");
        }
        for bad in ["", "a@", "@x.com", "a@x", "a@@x.com", "a@x.c", "a..b@x.com", "a@-x.com", "a b@x.com"] {
            assert!(!is_valid_email(bad), "{bad}");
        }
    }
}
