use serde::{Deserialize, Serialize};

/// The four independent capabilities an account may hold.
///
/// Always produced by [`crate::policy::derive_permissions`]; there is no
/// public path that accepts a permission set from a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    pub can_create_employee: bool,
    pub can_update_employee: bool,
    pub can_delete_employee: bool,
    pub can_manage_users: bool,
}

/// A single capability, used by boundary guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    CreateEmployee,
    UpdateEmployee,
    DeleteEmployee,
    ManageUsers,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CreateEmployee => "employees.create",
            Permission::UpdateEmployee => "employees.update",
            Permission::DeleteEmployee => "employees.delete",
            Permission::ManageUsers => "users.manage",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PermissionSet {
    pub fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::CreateEmployee => self.can_create_employee,
            Permission::UpdateEmployee => self.can_update_employee,
            Permission::DeleteEmployee => self.can_delete_employee,
            Permission::ManageUsers => self.can_manage_users,
        }
    }
}
