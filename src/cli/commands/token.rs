use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::JwtKeys;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a development access token signed with JWT_SECRET")]
    Issue {
        #[arg(long, help = "User ID (UUID) to put in the token subject")]
        user: Uuid,
        #[arg(long, help = "Email claim")]
        email: Option<String>,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue { user, email } => {
            let security = &config::config().security;
            if security.jwt_secret.is_empty() {
                anyhow::bail!("JWT_SECRET is not set");
            }

            let keys = JwtKeys::from_config(security);
            let claims = keys.claims_for(user, email);
            let token = keys.encode(&claims)?;

            match output_format {
                // Bare token so it can be captured by a shell
                OutputFormat::Text => println!("{}", token),
                OutputFormat::Json => output_success(
                    &output_format,
                    &format!("Issued token for {}", user),
                    Some(json!({ "token": token, "expires_at": claims.exp })),
                )?,
            }
            Ok(())
        }
    }
}
