use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::{DatabaseError, MemberStore, RoleStore};
use crate::permissions::{PermissionResolver, Role};
use crate::sync::{DirectorySyncJob, SyncDirection, SyncError, SyncReport};

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Only administrators can run a directory sync")]
    Forbidden,

    #[error("Failed to verify caller role: {0}")]
    RoleLookup(#[source] DatabaseError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Entry point for running a directory sync on behalf of a caller.
///
/// The caller's role is re-read from the primary store on every trigger;
/// token claims are never trusted for this.
pub struct SyncService {
    primary: Arc<dyn MemberStore>,
    secondary: Arc<dyn MemberStore>,
    roles: Arc<dyn RoleStore>,
    batch_size: usize,
}

impl SyncService {
    pub fn new(
        primary: Arc<dyn MemberStore>,
        secondary: Arc<dyn MemberStore>,
        roles: Arc<dyn RoleStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            primary,
            secondary,
            roles,
            batch_size,
        }
    }

    pub async fn trigger(&self, user_id: Uuid, direction: SyncDirection) -> Result<SyncReport, TriggerError> {
        let rows = self
            .roles
            .roles_for(user_id)
            .await
            .map_err(TriggerError::RoleLookup)?;

        let resolver = PermissionResolver::from_rows(&rows);
        if resolver.role() != Some(Role::Administrator) {
            warn!(
                "Rejected directory sync from {} (role: {})",
                user_id,
                resolver.role().map(|r| r.as_str()).unwrap_or("none")
            );
            return Err(TriggerError::Forbidden);
        }

        info!("Directory sync ({}) requested by administrator {}", direction, user_id);
        let report = DirectorySyncJob::new(&*self.primary, &*self.secondary)
            .with_batch_size(self.batch_size)
            .run(direction)
            .await?;
        Ok(report)
    }
}
