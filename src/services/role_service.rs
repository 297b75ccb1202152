use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::{DatabaseError, RoleStore};
use crate::permissions::{Capability, PermissionResolver, Role};

#[derive(Debug, Error)]
pub enum RoleAdminError {
    #[error("Missing capability: {0}")]
    Forbidden(Capability),

    #[error("User {user_id} does not hold role {role}")]
    NotAssigned { user_id: Uuid, role: Role },

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// A user's stored role rows alongside what they resolve to
#[derive(Debug, Clone, Serialize)]
pub struct RoleAssignment {
    pub user_id: Uuid,
    pub rows: Vec<String>,
    pub role: Option<Role>,
    pub capabilities: Vec<Capability>,
}

impl RoleAssignment {
    fn from_rows(user_id: Uuid, rows: Vec<String>) -> Self {
        let resolver = PermissionResolver::from_rows(&rows);
        Self {
            user_id,
            rows,
            role: resolver.role(),
            capabilities: resolver.capabilities(),
        }
    }
}

pub struct RoleService {
    roles: Arc<dyn RoleStore>,
}

impl RoleService {
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        Self { roles }
    }

    /// Resolve what an identity may do. Lookup failures degrade to "no
    /// role" so consumers hide features instead of failing.
    pub async fn resolver_for(&self, user_id: Uuid) -> PermissionResolver {
        match self.roles.roles_for(user_id).await {
            Ok(rows) => PermissionResolver::from_rows(&rows),
            Err(e) => {
                warn!("Role lookup for {} failed, treating as no role: {}", user_id, e);
                PermissionResolver::default()
            }
        }
    }

    pub async fn authorize(&self, actor: Uuid, capability: Capability) -> Result<(), RoleAdminError> {
        if self.resolver_for(actor).await.can(capability) {
            Ok(())
        } else {
            warn!("User {} lacks {}", actor, capability);
            Err(RoleAdminError::Forbidden(capability))
        }
    }

    pub async fn assignment(&self, user_id: Uuid) -> Result<RoleAssignment, RoleAdminError> {
        let rows = self.roles.roles_for(user_id).await?;
        Ok(RoleAssignment::from_rows(user_id, rows))
    }

    pub async fn assign(&self, user_id: Uuid, role: Role) -> Result<RoleAssignment, RoleAdminError> {
        self.roles.assign(user_id, role).await?;
        info!("Assigned role {} to {}", role, user_id);
        self.assignment(user_id).await
    }

    pub async fn revoke(&self, user_id: Uuid, role: Role) -> Result<RoleAssignment, RoleAdminError> {
        if !self.roles.revoke(user_id, role).await? {
            return Err(RoleAdminError::NotAssigned { user_id, role });
        }
        info!("Revoked role {} from {}", role, user_id);
        self.assignment(user_id).await
    }
}
