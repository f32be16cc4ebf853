//! Logout command implementation

use colored::Colorize;

use crate::cli::CommandContext;
use crate::error::Result;

/// Clear every stored token; safe to run when already signed out
pub async fn run(ctx: &CommandContext) -> Result<()> {
    ctx.tokens().clear().await?;
    println!("{} Signed out", "✓".green());
    Ok(())
}
