use clap::Subcommand;
use std::sync::Arc;
use uuid::Uuid;

use crate::cli::utils::{output_success, to_data};
use crate::cli::OutputFormat;
use crate::config;
use crate::database::{DatabaseManager, PostgresRoleStore};
use crate::permissions::Role;
use crate::services::{RoleAssignment, RoleService};

/// Operator commands run with database credentials, so there is no actor
/// check here. This is how the first administrator gets assigned.
#[derive(Subcommand)]
pub enum RolesCommands {
    #[command(about = "Show a user's role rows and resolved capabilities")]
    Show {
        #[arg(help = "User ID (UUID)")]
        user_id: Uuid,
    },

    #[command(about = "Replace a user's roles with a single role")]
    Assign {
        #[arg(help = "User ID (UUID)")]
        user_id: Uuid,
        #[arg(help = "Role name (administrator, staff, editor, teacher, member, viewer)")]
        role: Role,
    },

    #[command(about = "Remove a role from a user")]
    Revoke {
        #[arg(help = "User ID (UUID)")]
        user_id: Uuid,
        #[arg(help = "Role name")]
        role: Role,
    },
}

pub async fn handle(cmd: RolesCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::primary_pool(&config::config().database)?;
    let service = RoleService::new(Arc::new(PostgresRoleStore::new(pool)));

    match cmd {
        RolesCommands::Show { user_id } => {
            let assignment = service.assignment(user_id).await?;
            print_assignment(&output_format, &format!("Roles for {}", user_id), &assignment)
        }
        RolesCommands::Assign { user_id, role } => {
            let assignment = service.assign(user_id, role).await?;
            print_assignment(&output_format, &format!("Assigned role {} to {}", role, user_id), &assignment)
        }
        RolesCommands::Revoke { user_id, role } => {
            let assignment = service.revoke(user_id, role).await?;
            print_assignment(&output_format, &format!("Revoked role {} from {}", role, user_id), &assignment)
        }
    }
}

fn print_assignment(output_format: &OutputFormat, message: &str, assignment: &RoleAssignment) -> anyhow::Result<()> {
    output_success(output_format, message, to_data(assignment)?)?;

    if let OutputFormat::Text = output_format {
        let role = assignment.role.map(|role| role.to_string()).unwrap_or_else(|| "none".to_string());
        println!("Role: {}", role);
        if !assignment.rows.is_empty() {
            println!("Rows: {}", assignment.rows.join(", "));
        }
        let capabilities = assignment
            .capabilities
            .iter()
            .map(|capability| capability.as_str())
            .collect::<Vec<_>>();
        println!("Capabilities: {}", if capabilities.is_empty() { "-".to_string() } else { capabilities.join(", ") });
    }
    Ok(())
}
