use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;
use crate::database::{DatabaseManager, MemberStore, MySqlMemberStore, PostgresMemberStore, PostgresRoleStore};

/// Create the `members` table in both stores and `user_roles` in the primary
pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    let primary_pool = DatabaseManager::primary_pool(&config.database)?;
    let secondary_pool = DatabaseManager::secondary_pool(&config.database)?;

    let primary = PostgresMemberStore::new(primary_pool.clone());
    let secondary = MySqlMemberStore::new(secondary_pool);
    let roles = PostgresRoleStore::new(primary_pool);

    primary.ensure_schema().await?;
    tracing::info!("members table ready in {} store", primary.label());
    secondary.ensure_schema().await?;
    tracing::info!("members table ready in {} store", secondary.label());
    roles.ensure_schema().await?;

    output_success(
        &output_format,
        "Schema initialized in primary and secondary stores",
        Some(json!({ "tables": { "primary": ["members", "user_roles"], "secondary": ["members"] } })),
    )
}
