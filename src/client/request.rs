//! Request and response shapes for the API client

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::error::ClientResult;

/// Options for a single API call
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method
    pub method: Method,

    /// Extra request headers
    pub headers: Vec<(String, String)>,

    /// Request body, if any
    pub body: Option<RequestBody>,

    /// Attach the bearer token and handle token renewal
    pub auth: bool,

    /// Per-call timeout; falls back to the client's default (or upload) timeout
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: None,
            auth: true,
            timeout: None,
        }
    }
}

impl RequestOptions {
    /// Authenticated request with the given method
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Authenticated GET
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// Authenticated POST with a JSON body
    pub fn post(body: Value) -> Self {
        Self::new(Method::POST).json(body)
    }

    /// Set a JSON body
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Set a multipart form body
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = Some(RequestBody::Multipart(form));
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send without a bearer token and without renewal handling
    pub fn without_auth(mut self) -> Self {
        self.auth = false;
        self
    }

    /// Override the timeout for this call
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether the body is a multipart upload
    pub fn is_upload(&self) -> bool {
        matches!(self.body, Some(RequestBody::Multipart(_)))
    }
}

/// Request payload
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Serialized as JSON with `Content-Type: application/json`
    Json(Value),
    /// Sent as `multipart/form-data`; the boundary header is set by the HTTP stack
    Multipart(MultipartForm),
}

/// Multipart form that can be rebuilt for a retried request
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

#[derive(Debug, Clone)]
enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: String,
        data: Vec<u8>,
    },
}

impl MultipartForm {
    /// Empty form
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a file part; the content type is guessed from the file name
    pub fn file(self, name: impl Into<String>, file_name: impl Into<String>, data: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();
        self.file_with_type(name, file_name, content_type, data)
    }

    /// Add a file part with an explicit content type
    pub fn file_with_type(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        });
        self
    }

    /// Read a file from disk into a new part
    pub async fn file_from_path(self, name: impl Into<String>, path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(self.file(name, file_name, data))
    }

    /// Number of parts
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the form has no parts
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Build the reqwest form for one send
    pub(crate) fn to_form(&self) -> ClientResult<Form> {
        let mut form = Form::new();
        for part in &self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
                FormPart::File {
                    name,
                    file_name,
                    content_type,
                    data,
                } => {
                    let part = Part::bytes(data.clone())
                        .file_name(file_name.clone())
                        .mime_str(content_type)?;
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}

/// Parsed success response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// 204 or an empty body
    Empty,
    /// JSON document
    Json(Value),
    /// Body that is not JSON
    Text(String),
}

impl ResponseBody {
    /// Classify a success body
    pub fn parse(status: StatusCode, body: String) -> Self {
        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return ResponseBody::Empty;
        }
        match serde_json::from_str(&body) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(body),
        }
    }

    /// Whether there is no content
    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }

    /// JSON view of the body, if it is JSON
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Convert into a JSON value (`null` for empty, a string for text)
    pub fn into_json(self) -> Value {
        match self {
            ResponseBody::Empty => Value::Null,
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
        }
    }
}

/// Join a path onto the base URL with exactly one slash between them.
///
/// Absolute `http://` / `https://` paths pass through unchanged.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://api.example.org/api", "sightings/"),
            "https://api.example.org/api/sightings/"
        );
        assert_eq!(
            join_url("https://api.example.org/api/", "/sightings/"),
            "https://api.example.org/api/sightings/"
        );
        assert_eq!(
            join_url("https://api.example.org/api//", "//species/12/"),
            "https://api.example.org/api/species/12/"
        );
        assert_eq!(join_url("https://api.example.org", ""), "https://api.example.org/");
    }

    #[test]
    fn test_join_url_absolute_passthrough() {
        assert_eq!(
            join_url("https://api.example.org/api", "https://cdn.example.org/img.jpg"),
            "https://cdn.example.org/img.jpg"
        );
        assert_eq!(
            join_url("https://api.example.org/api", "http://localhost:8000/login/"),
            "http://localhost:8000/login/"
        );
    }

    #[test]
    fn test_response_body_parse() {
        assert_eq!(
            ResponseBody::parse(StatusCode::NO_CONTENT, "ignored".to_string()),
            ResponseBody::Empty
        );
        assert_eq!(ResponseBody::parse(StatusCode::OK, "  ".to_string()), ResponseBody::Empty);
        assert_eq!(
            ResponseBody::parse(StatusCode::OK, r#"{"id": 3}"#.to_string()),
            ResponseBody::Json(json!({ "id": 3 }))
        );
        assert_eq!(
            ResponseBody::parse(StatusCode::OK, "Red fox".to_string()),
            ResponseBody::Text("Red fox".to_string())
        );
    }

    #[test]
    fn test_response_body_into_json() {
        assert_eq!(ResponseBody::Empty.into_json(), Value::Null);
        assert_eq!(ResponseBody::Text("ok".into()).into_json(), json!("ok"));
    }

    #[test]
    fn test_request_options_defaults() {
        let opts = RequestOptions::default();
        assert_eq!(opts.method, Method::GET);
        assert!(opts.auth);
        assert!(opts.body.is_none());
        assert!(!opts.is_upload());

        let opts = RequestOptions::post(json!({ "species": "Vulpes vulpes" })).without_auth();
        assert_eq!(opts.method, Method::POST);
        assert!(!opts.auth);
    }

    #[test]
    fn test_multipart_form_guesses_content_type() {
        let form = MultipartForm::new()
            .text("species", "Red fox")
            .file("photo", "fox.jpg", vec![0xff, 0xd8]);

        assert_eq!(form.len(), 2);
        match &form.parts[1] {
            FormPart::File { content_type, .. } => assert_eq!(content_type, "image/jpeg"),
            _ => panic!("Expected file part"),
        }
        assert!(form.to_form().is_ok());
    }

    #[test]
    fn test_multipart_options_are_uploads() {
        let opts = RequestOptions::new(Method::POST).multipart(MultipartForm::new());
        assert!(opts.is_upload());
    }

    #[tokio::test]
    async fn test_file_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("owl.png");
        std::fs::write(&path, b"png").unwrap();

        let form = MultipartForm::new().file_from_path("photo", &path).await.unwrap();
        match &form.parts[0] {
            FormPart::File {
                file_name,
                content_type,
                data,
                ..
            } => {
                assert_eq!(file_name, "owl.png");
                assert_eq!(content_type, "image/png");
                assert_eq!(data, b"png");
            }
            _ => panic!("Expected file part"),
        }
    }
}
