use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::permissions::Role;

/// Role assignment rows kept in the primary store
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Raw stored role values for an identity, legacy names included
    async fn roles_for(&self, user_id: Uuid) -> Result<Vec<String>, DatabaseError>;

    /// Replace every row for the identity with the single given role
    async fn assign(&self, user_id: Uuid, role: Role) -> Result<(), DatabaseError>;

    /// Delete one role row; returns whether anything was removed
    async fn revoke(&self, user_id: Uuid, role: Role) -> Result<bool, DatabaseError>;
}

#[derive(Clone)]
pub struct PostgresRoleStore {
    pool: PgPool,
}

impl PostgresRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_roles (
                id BIGSERIAL PRIMARY KEY,
                user_id UUID NOT NULL,
                role TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (user_id, role)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RoleStore for PostgresRoleStore {
    async fn roles_for(&self, user_id: Uuid) -> Result<Vec<String>, DatabaseError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(role,)| role).collect())
    }

    async fn assign(&self, user_id: Uuid, role: Role) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn revoke(&self, user_id: Uuid, role: Role) -> Result<bool, DatabaseError> {
        // Legacy rows that alias to this role go too
        let names: Vec<String> = role.stored_names().into_iter().map(String::from).collect();

        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role = ANY($2)")
            .bind(user_id)
            .bind(&names)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
