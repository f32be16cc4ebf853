//! Status command implementation

use colored::Colorize;

use crate::cli::CommandContext;
use crate::client::jwt;
use crate::error::Result;

/// Show configuration and stored session state without touching the network
pub async fn run(ctx: &CommandContext) -> Result<()> {
    println!("{}\n", "Wildspot Status".bold());

    println!("Config file: {}", ctx.config_path.display().to_string().cyan());
    if !ctx.config_path.exists() {
        println!("  {}", "(not found, using defaults)".dimmed());
    }
    println!("Token store: {}", ctx.store.path().display().to_string().cyan());
    println!();

    match &ctx.config.api_url {
        Some(url) => println!("{} API URL: {}", "✓".green(), url),
        None => {
            println!("{} API URL not configured", "✗".red());
            println!("  → Set api_url in the config file or pass --api-url");
        }
    }

    let credentials = ctx.tokens().snapshot().await?;
    let now = chrono::Utc::now().timestamp();

    match (&credentials.access_token, credentials.access_expiry) {
        (None, _) => {
            println!("{} Not signed in", "○".dimmed());
            println!("  → Run 'wildspot login --email <EMAIL>'");
        }
        (Some(_), None) => {
            println!("{} Access token stored (expiry unknown)", "✓".green());
        }
        (Some(_), Some(exp)) => {
            if jwt::needs_renewal(Some(exp), ctx.config.expiry_leeway_secs) {
                println!(
                    "{} Access token {} (will refresh on next request)",
                    "⚠".yellow(),
                    describe_expiry(exp, now)
                );
            } else {
                println!("{} Access token {}", "✓".green(), describe_expiry(exp, now));
            }
        }
    }

    if credentials.refresh_token.is_some() {
        println!("{} Refresh token stored", "✓".green());
    } else if credentials.access_token.is_some() {
        println!("{} No refresh token stored", "⚠".yellow());
    }

    Ok(())
}

/// Human description of an expiry relative to `now`
pub fn describe_expiry(exp: i64, now: i64) -> String {
    let remaining = exp.saturating_sub(now);
    if remaining <= 0 {
        let ago = remaining.saturating_neg();
        return format!("expired {} ago", format_duration(ago));
    }
    format!("expires in {}", format_duration(remaining))
}

fn format_duration(secs: i64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else if mins > 0 {
        format!("{}m", mins)
    } else {
        format!("{}s", secs)
    }
}
