//! `hrdesk-auth`: identity registry, role policy, credentials and tokens.
//!
//! This crate is intentionally decoupled from HTTP. Persistence is reached only
//! through the [`AccountStore`] port.

pub mod account;
pub mod authorize;
pub mod credential;
pub mod normalize;
pub mod permissions;
pub mod policy;
pub mod registry;
pub mod roles;
pub mod session;
pub mod store;
pub mod token;
pub mod validate;

pub use account::{
    Account, AccountDraft, AccountKind, AccountPatch, AccountProfile, AccountRecord,
    EmployeeProfile, NewEmployee, NewUser, Position,
};
pub use authorize::{authorize, authorize_user_update, AuthzError, Principal};
pub use credential::{CredentialError, CredentialStore, HashingConfig, PasswordHash};
pub use normalize::{normalize, ErrorBody};
pub use permissions::{Permission, PermissionSet};
pub use policy::{admit, derive_permissions, Admission, Denial, RoleCounts};
pub use registry::IdentityRegistry;
pub use roles::{AccountStatus, Role};
pub use session::{Session, Sessions};
pub use store::{
    advance_timestamp, AccountStore, DepartmentStats, EmployeePage, EmployeeQuery, EmployeeStats,
    SortField, SortOrder, StoreError,
};
pub use token::{Claims, TokenConfig, TokenError, TokenService};
