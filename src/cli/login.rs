//! Login command implementation

use colored::Colorize;
use dialoguer::{Password, theme::ColorfulTheme};

use crate::cli::{CommandContext, LoginArgs};
use crate::error::Result;

/// Sign in with email and password and persist the session
pub async fn run(ctx: &CommandContext, args: &LoginArgs) -> Result<()> {
    let client = ctx.client()?;

    let password = match &args.password {
        Some(password) => password.clone(),
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Password for {}", args.email))
            .interact()?,
    };

    println!("{}", format!("Signing in to {}...", client.base_url()).cyan());
    let credentials = client.login(&args.email, &password).await?;

    println!("{} Signed in as {}", "✓".green(), args.email.bold());
    if credentials.refresh_token.is_none() {
        println!(
            "{} No refresh token issued; you will need to sign in again when the session expires",
            "⚠".yellow()
        );
    }

    Ok(())
}
