//! Refresh command implementation

use colored::Colorize;

use crate::cli::CommandContext;
use crate::cli::status::describe_expiry;
use crate::error::Result;

/// Force a token refresh now
pub async fn run(ctx: &CommandContext) -> Result<()> {
    let client = ctx.client()?;
    client.refresh().await?;

    let credentials = client.credentials().await?;
    println!("{} Access token renewed", "✓".green());
    if let Some(exp) = credentials.access_expiry {
        println!("  {}", describe_expiry(exp, chrono::Utc::now().timestamp()));
    }
    Ok(())
}
