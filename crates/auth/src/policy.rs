//! Role policy: capacity admission and permission derivation.
//!
//! - No IO
//! - No panics
//! - The only place that knows role capacities and the role → permission table

use serde::{Deserialize, Serialize};

use crate::{PermissionSet, Role};

/// Maximum number of ADMIN accounts in the registry.
pub const ADMIN_CAPACITY: usize = 1;

/// Maximum number of MANAGER accounts in the registry.
pub const MANAGER_CAPACITY: usize = 2;

/// Current population of the capacity-limited roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleCounts {
    pub admins: usize,
    pub managers: usize,
}

impl RoleCounts {
    /// Count one more holder of `role`.
    pub fn record(&mut self, role: Role) {
        match role {
            Role::Admin => self.admins += 1,
            Role::Manager => self.managers += 1,
            Role::Employee => {}
        }
    }
}

/// Why a role was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denial {
    pub role: Role,
    pub reason: &'static str,
}

impl core::fmt::Display for Denial {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.reason)
    }
}

/// Outcome of an admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Deny(Denial),
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allow)
    }

    pub fn into_result(self) -> Result<(), Denial> {
        match self {
            Admission::Allow => Ok(()),
            Admission::Deny(denial) => Err(denial),
        }
    }
}

/// Signature of the admission decision, handed to stores so they can re-run it
/// inside their write critical section.
pub type AdmissionCheck = fn(Role, usize, usize) -> Admission;

/// Decide whether one more account with `requested` may exist given the
/// current ADMIN and MANAGER populations.
pub fn admit(requested: Role, admin_count: usize, manager_count: usize) -> Admission {
    match requested {
        Role::Admin if admin_count >= ADMIN_CAPACITY => Admission::Deny(Denial {
            role: Role::Admin,
            reason: "admin already exists",
        }),
        Role::Manager if manager_count >= MANAGER_CAPACITY => Admission::Deny(Denial {
            role: Role::Manager,
            reason: "manager capacity reached",
        }),
        _ => Admission::Allow,
    }
}

/// [`admit`] over a [`RoleCounts`] snapshot.
pub fn admit_counts(requested: Role, counts: RoleCounts) -> Admission {
    admit(requested, counts.admins, counts.managers)
}

/// The permission set a role carries. Pure function of the role.
pub fn derive_permissions(role: Role) -> PermissionSet {
    match role {
        Role::Admin => PermissionSet {
            can_create_employee: true,
            can_update_employee: true,
            can_delete_employee: true,
            can_manage_users: true,
        },
        Role::Manager => PermissionSet {
            can_create_employee: true,
            can_update_employee: true,
            can_delete_employee: false,
            can_manage_users: false,
        },
        Role::Employee => PermissionSet::default(),
    }
}
