//! Upload command implementation

use std::path::Path;

use crate::cli::request::{parse_method, print_body};
use crate::cli::{CommandContext, UploadArgs};
use crate::client::{MultipartForm, RequestOptions};
use crate::error::Result;

/// Upload a file (plus extra text fields) as multipart/form-data
pub async fn run(ctx: &CommandContext, args: &UploadArgs) -> Result<()> {
    let client = ctx.client()?;

    let form = args
        .form
        .iter()
        .fold(MultipartForm::new(), |form, (key, value)| form.text(key, value));
    let form = form.file_from_path(&args.field, Path::new(&args.file)).await?;
    log::debug!("Uploading {} as field `{}`", args.file, args.field);

    let options = RequestOptions::new(parse_method(&args.method)?).multipart(form);
    let body = client.request(&args.path, options).await?;
    print_body(&body)
}
