pub mod role_service;
pub mod sync_service;

pub use role_service::{RoleAdminError, RoleAssignment, RoleService};
pub use sync_service::{SyncService, TriggerError};
