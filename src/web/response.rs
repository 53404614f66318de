//! Device response bodies.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::error::{single_line, ResultCode};
use crate::mail::MailItem;

/// A successful `cd=100` response with extra `key=value` lines.
#[derive(Debug, Clone)]
pub struct DeviceResponse {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl DeviceResponse {
    /// Create a success response.
    pub fn ok() -> Self {
        Self {
            message: "Success.".to_string(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn field(mut self, key: &'static str, value: impl ToString) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    /// Render the `cd`/`msg` lines followed by the fields.
    pub fn render(&self) -> String {
        let mut out = format!(
            "cd={}\nmsg={}\n",
            ResultCode::Success.code(),
            single_line(&self.message)
        );
        for (key, value) in &self.fields {
            out.push_str(key);
            out.push('=');
            out.push_str(&single_line(value));
            out.push('\n');
        }
        out
    }
}

impl IntoResponse for DeviceResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.render(),
        )
            .into_response()
    }
}

/// Receive response: a status part followed by one part per mail.
#[derive(Debug)]
pub struct ReceiveResponse {
    boundary: String,
    mails: Vec<MailItem>,
}

impl ReceiveResponse {
    /// Wrap the mails handed out by a Receive.
    pub fn new(mails: Vec<MailItem>) -> Self {
        Self {
            boundary: format!("BOUNDARY-{}", Uuid::new_v4().simple()),
            mails,
        }
    }

    /// The multipart boundary.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Build the multipart body.
    pub fn body(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let status = DeviceResponse::ok().field("mailnum", self.mails.len());

        out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        out.extend_from_slice(b"Content-Type: text/plain\r\n\r\n");
        out.extend_from_slice(status.render().replace('\n', "\r\n").as_bytes());

        for mail in &self.mails {
            out.extend_from_slice(format!("\r\n--{}\r\n", self.boundary).as_bytes());
            out.extend_from_slice(b"Content-Type: text/plain\r\n");
            out.extend_from_slice(format!("X-Mail-Id: {}\r\n", mail.id).as_bytes());
            out.extend_from_slice(format!("From: {}\r\n", single_line(&mail.sender)).as_bytes());
            out.extend_from_slice(format!("To: {}\r\n", single_line(&mail.recipient)).as_bytes());
            if let Some(subject) = &mail.subject {
                out.extend_from_slice(format!("Subject: {}\r\n", single_line(subject)).as_bytes());
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&mail.body);
        }

        out.extend_from_slice(format!("\r\n--{}--\r\n", self.boundary).as_bytes());
        out
    }
}

impl IntoResponse for ReceiveResponse {
    fn into_response(self) -> Response {
        let content_type = format!("multipart/mixed; boundary={}", self.boundary);
        let body = self.body();
        match Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Failed to build receive response: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
