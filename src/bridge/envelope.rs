//! Inbound email envelopes.
//!
//! The inbound-parse webhook posts one form per received message. A message
//! may name several recipients; each becomes its own [`InboundEnvelope`].

use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

/// Envelope parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The `envelope` field is not valid JSON.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// No recipient could be determined.
    #[error("no recipient")]
    MissingRecipient,

    /// Neither the raw message nor a text body was posted.
    #[error("no message body")]
    MissingBody,
}

/// One inbound message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEnvelope {
    /// Sender address.
    pub from: String,
    /// Recipient address, without display name.
    pub to: String,
    /// Subject, if present.
    pub subject: Option<String>,
    /// Message content, stored as-is.
    pub raw_body: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeJson {
    #[serde(default)]
    to: Vec<String>,
    #[serde(default)]
    from: Option<String>,
}

/// Fields collected from an inbound-parse form post.
#[derive(Debug, Clone, Default)]
pub struct WebhookForm {
    /// JSON `{"to": [...], "from": "..."}` with the SMTP envelope.
    pub envelope: Option<String>,
    /// `To` header.
    pub to: Option<String>,
    /// `From` header.
    pub from: Option<String>,
    /// `Subject` header.
    pub subject: Option<String>,
    /// Full raw MIME message.
    pub email: Option<Vec<u8>>,
    /// Plain text body.
    pub text: Option<Vec<u8>>,
}

impl WebhookForm {
    /// Split the post into one envelope per recipient.
    ///
    /// The SMTP envelope is preferred over the headers, and the raw message
    /// over the text body.
    pub fn into_envelopes(self) -> Result<Vec<InboundEnvelope>, EnvelopeError> {
        let parsed = match self.envelope.as_deref().map(str::trim) {
            Some(json) if !json.is_empty() => Some(
                serde_json::from_str::<EnvelopeJson>(json)
                    .map_err(|e| EnvelopeError::InvalidEnvelope(e.to_string()))?,
            ),
            _ => None,
        };

        let (mut recipients, envelope_from) = match parsed {
            Some(env) => (
                env.to.iter().map(|t| extract_address(t)).collect::<Vec<_>>(),
                env.from,
            ),
            None => (Vec::new(), None),
        };
        if recipients.is_empty() {
            if let Some(to) = &self.to {
                recipients = split_addresses(to);
            }
        }
        let mut seen = HashSet::new();
        recipients.retain(|r| !r.is_empty() && seen.insert(r.clone()));
        if recipients.is_empty() {
            return Err(EnvelopeError::MissingRecipient);
        }

        let from = envelope_from
            .or(self.from)
            .map(|f| extract_address(&f))
            .unwrap_or_default();

        let body = self
            .email
            .filter(|b| !b.is_empty())
            .or(self.text)
            .ok_or(EnvelopeError::MissingBody)?;

        let subject = self
            .subject
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(recipients
            .into_iter()
            .map(|to| InboundEnvelope {
                from: from.clone(),
                to,
                subject: subject.clone(),
                raw_body: body.clone(),
            })
            .collect())
    }
}

/// Extract the bare address from `Display Name <user@host>`.
pub fn extract_address(value: &str) -> String {
    let value = value.trim();
    match (value.rfind('<'), value.rfind('>')) {
        (Some(start), Some(end)) if start < end => value[start + 1..end].trim().to_string(),
        _ => value.trim_matches(|c| c == '"' || c == '\'').to_string(),
    }
}

/// Split an address-list header, ignoring commas inside quotes and angle brackets.
pub fn split_addresses(header: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_angle = false;

    for c in header.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => in_angle = true,
            '>' if !in_quotes => in_angle = false,
            ',' if !in_quotes && !in_angle => {
                out.push(extract_address(&current));
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    out.push(extract_address(&current));
    out.retain(|a| !a.is_empty());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_address() {
        assert_eq!(extract_address("user@example.com"), "user@example.com");
        assert_eq!(
            extract_address("Some One <user@example.com>"),
            "user@example.com"
        );
        assert_eq!(
            extract_address("  \"Doe, J\" < user@example.com > "),
            "user@example.com"
        );
    }

    #[test]
    fn test_split_addresses() {
        assert_eq!(
            split_addresses("\"Doe, J\" <a@x.org>, b@y.org"),
            vec!["a@x.org".to_string(), "b@y.org".to_string()]
        );
        assert!(split_addresses(" , ").is_empty());
    }

    #[test]
    fn test_envelope_json_preferred() {
        let form = WebhookForm {
            envelope: Some(
                r#"{"to":["w1234567890123456@mail.example.com","other@x.org"],"from":"bounce@y.org"}"#
                    .to_string(),
            ),
            to: Some("ignored@z.org".to_string()),
            from: Some("Friend <friend@y.org>".to_string()),
            subject: Some(" Hello ".to_string()),
            email: Some(b"raw mime".to_vec()),
            text: Some(b"text".to_vec()),
        };

        let envelopes = form.into_envelopes().unwrap();
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[0].to, "w1234567890123456@mail.example.com");
        assert_eq!(envelopes[1].to, "other@x.org");
        assert_eq!(envelopes[0].from, "bounce@y.org");
        assert_eq!(envelopes[0].subject.as_deref(), Some("Hello"));
        assert_eq!(envelopes[0].raw_body, b"raw mime");
    }

    #[test]
    fn test_falls_back_to_headers_and_text() {
        let form = WebhookForm {
            to: Some("Device <w1234567890123456@mail.example.com>".to_string()),
            from: Some("Friend <friend@y.org>".to_string()),
            text: Some(b"plain".to_vec()),
            ..Default::default()
        };

        let envelopes = form.into_envelopes().unwrap();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].to, "w1234567890123456@mail.example.com");
        assert_eq!(envelopes[0].from, "friend@y.org");
        assert!(envelopes[0].subject.is_none());
        assert_eq!(envelopes[0].raw_body, b"plain");
    }

    #[test]
    fn test_repeated_recipients_collapse() {
        let form = WebhookForm {
            envelope: Some(
                r#"{"to":["a@x.org","b@x.org","<a@x.org>","b@x.org"]}"#.to_string(),
            ),
            text: Some(b"x".to_vec()),
            ..Default::default()
        };

        let to: Vec<String> = form
            .into_envelopes()
            .unwrap()
            .into_iter()
            .map(|e| e.to)
            .collect();
        assert_eq!(to, ["a@x.org", "b@x.org"]);
    }

    #[test]
    fn test_missing_pieces() {
        let no_to = WebhookForm {
            text: Some(b"x".to_vec()),
            ..Default::default()
        };
        assert_eq!(no_to.into_envelopes(), Err(EnvelopeError::MissingRecipient));

        let no_body = WebhookForm {
            to: Some("a@b.org".to_string()),
            ..Default::default()
        };
        assert_eq!(no_body.into_envelopes(), Err(EnvelopeError::MissingBody));

        let bad_json = WebhookForm {
            envelope: Some("{not json".to_string()),
            text: Some(b"x".to_vec()),
            ..Default::default()
        };
        assert!(matches!(
            bad_json.into_envelopes(),
            Err(EnvelopeError::InvalidEnvelope(_))
        ));
    }
}
