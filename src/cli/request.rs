//! Request command implementation

use reqwest::Method;
use serde_json::Value;

use crate::cli::{CommandContext, RequestArgs};
use crate::client::{RequestOptions, ResponseBody};
use crate::error::{Error, Result};

/// Send one API call and print the response body
pub async fn run(ctx: &CommandContext, args: &RequestArgs) -> Result<()> {
    let client = ctx.client()?;

    let mut options = RequestOptions::new(parse_method(&args.method)?);
    if let Some(data) = &args.data {
        let body: Value = serde_json::from_str(data)?;
        options = options.json(body);
    }
    if args.no_auth {
        options = options.without_auth();
    }

    let body = client.request(&args.path, options).await?;
    print_body(&body)
}

/// Parse an HTTP method name, case-insensitively
pub(crate) fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::Other(format!("Invalid HTTP method: {}", raw)))
}

/// Print a response: JSON pretty-printed, text as-is, nothing for empty bodies
pub(crate) fn print_body(body: &ResponseBody) -> Result<()> {
    match body {
        ResponseBody::Empty => {}
        ResponseBody::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
        ResponseBody::Text(text) => println!("{}", text),
    }
    Ok(())
}
