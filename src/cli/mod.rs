//! CLI command definitions and handlers

use clap::{Args, Parser, Subcommand};

use crate::error::{Error, ErrorKind};

pub mod context;
pub mod login;
pub mod logout;
pub mod refresh;
pub mod request;
pub mod status;
pub mod upload;

pub use context::CommandContext;

/// Wildspot - command-line client for the Wildspot wildlife API
#[derive(Parser, Debug)]
#[command(name = "wildspot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Override config file location
    #[arg(long, global = true, env = "WILDSPOT_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override the API base URL
    #[arg(long, global = true, env = "WILDSPOT_API_URL", hide_env = true)]
    pub api_url: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "WILDSPOT_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session tokens
    Login(LoginArgs),

    /// Forget the stored session
    Logout,

    /// Show configuration and session status
    Status,

    /// Exchange the refresh token for a new access token
    Refresh,

    /// Send an API request and print the response
    Request(RequestArgs),

    /// Upload a file as multipart/form-data
    Upload(UploadArgs),
}

/// Arguments for `login`
#[derive(Debug, Clone, Args)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password (prompted when omitted)
    #[arg(long, env = "WILDSPOT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Arguments for `request`
#[derive(Debug, Clone, Args)]
pub struct RequestArgs {
    /// Path relative to the API base URL, or an absolute URL
    pub path: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,

    /// JSON request body
    #[arg(long, short = 'd')]
    pub data: Option<String>,

    /// Send without the bearer token
    #[arg(long)]
    pub no_auth: bool,
}

/// Arguments for `upload`
#[derive(Debug, Clone, Args)]
pub struct UploadArgs {
    /// Path relative to the API base URL, or an absolute URL
    pub path: String,

    /// File to upload
    #[arg(long, short = 'f')]
    pub file: String,

    /// Form field name for the file
    #[arg(long, default_value = "file")]
    pub field: String,

    /// Extra form fields as key=value
    #[arg(long = "form", value_parser = parse_key_value)]
    pub form: Vec<(String, String)>,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "POST")]
    pub method: String,
}

/// Follow-up advice printed under a failed command's error
pub fn hint_for(err: &Error) -> Option<&'static str> {
    match err {
        Error::Client(e) if e.logout => Some("Run 'wildspot login --email <EMAIL>' to sign in again"),
        Error::Client(e) if e.is_transport() && e.kind != ErrorKind::Storage => {
            Some("Check your network connection and the configured API URL")
        }
        _ => None,
    }
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got `{}`", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("species=Red fox").unwrap(),
            ("species".to_string(), "Red fox".to_string())
        );
        assert_eq!(
            parse_key_value("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("missing").is_err());
        assert!(parse_key_value("=value").is_err());
    }

    #[test]
    fn test_hint_for_errors() {
        let offline = Error::Client(ClientError::connect("connection refused"));
        assert!(hint_for(&offline).unwrap().contains("network"));

        let expired = Error::Client(ClientError::session_expired(None));
        assert!(hint_for(&expired).unwrap().contains("wildspot login"));

        let storage = Error::Client(ClientError::storage("disk full"));
        assert_eq!(hint_for(&storage), None);

        let server = Error::Client(ClientError::from_response(500, ""));
        assert_eq!(hint_for(&server), None);
    }

    #[test]
    fn test_cli_parses_request() {
        let cli = Cli::try_parse_from([
            "wildspot",
            "--api-url",
            "http://localhost:8000/api",
            "request",
            "sightings/",
            "-X",
            "POST",
            "--data",
            "{}",
        ])
        .unwrap();

        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:8000/api"));
        match cli.command {
            Commands::Request(args) => {
                assert_eq!(args.path, "sightings/");
                assert_eq!(args.method, "POST");
                assert_eq!(args.data.as_deref(), Some("{}"));
                assert!(!args.no_auth);
            }
            other => panic!("Expected request command, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_upload_form_fields() {
        let cli = Cli::try_parse_from([
            "wildspot",
            "upload",
            "photos/",
            "--file",
            "fox.jpg",
            "--form",
            "species=fox",
            "--form",
            "count=2",
        ])
        .unwrap();

        match cli.command {
            Commands::Upload(args) => {
                assert_eq!(args.field, "file");
                assert_eq!(args.method, "POST");
                assert_eq!(args.form.len(), 2);
            }
            other => panic!("Expected upload command, got {:?}", other),
        }
    }
}
