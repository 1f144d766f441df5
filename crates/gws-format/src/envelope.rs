//! MIME envelopes around typed payloads.
//!
//! A document is `multipart/mixed` with a plain-text summary first and the
//! typed payload second, so mail clients that know nothing about groupware
//! payloads still show something sensible. Envelope headers: `From` and `To`
//! are the owner, `Subject` is the object uid, and `X-Kolab-Type` names the
//! payload MIME type.

use gws_types::ObjectType;
use mail_builder::headers::raw::Raw;
use mail_builder::headers::text::Text;
use mail_builder::mime::MimePart;
use mail_builder::MessageBuilder;
use mailparse::MailHeaderMap;

use crate::error::{FormatError, FormatResult};

/// File name of the payload part.
pub const PAYLOAD_NAME: &str = "kolab.xml";

const SUMMARY: &str = "This is a groupware object. To view this object you need a \
client that understands the groupware storage format.";

/// Additional part carried over from a previous document.
struct CarriedPart {
    content_type: String,
    name: Option<String>,
    body: Vec<u8>,
}

/// Builds the documents written to the remote store.
#[derive(Clone, Debug)]
pub struct Envelope {
    user: String,
    user_agent: String,
}

impl Envelope {
    pub fn new(user: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            user_agent: user_agent.into(),
        }
    }

    /// A new document for object `uid`.
    pub fn build(&self, uid: &str, object_type: &ObjectType, payload: &[u8]) -> FormatResult<Vec<u8>> {
        self.assemble(&self.user, uid, object_type, payload, &[])
    }

    /// A replacement for `previous` with a new payload.
    ///
    /// The sender and any parts besides the summary and the payload (for
    /// example attachments added by another client) are kept.
    pub fn rebuild(
        &self,
        previous: &[u8],
        uid: &str,
        object_type: &ObjectType,
        payload: &[u8],
    ) -> FormatResult<Vec<u8>> {
        let mail = mailparse::parse_mail(previous).map_err(|e| FormatError::Envelope(e.to_string()))?;
        let sender = mail
            .headers
            .get_first_value("From")
            .unwrap_or_else(|| self.user.clone());
        let payload_mime = object_type.mime_type();

        let mut carried = Vec::new();
        for part in mail.subparts.iter().skip(1) {
            let content_type = part.ctype.mimetype.to_ascii_lowercase();
            if content_type == payload_mime {
                continue;
            }
            let body = part
                .get_body_raw()
                .map_err(|e| FormatError::Envelope(e.to_string()))?;
            let name = part
                .get_content_disposition()
                .params
                .get("filename")
                .cloned()
                .or_else(|| part.ctype.params.get("name").cloned());
            carried.push(CarriedPart {
                content_type,
                name,
                body,
            });
        }

        self.assemble(&sender, uid, object_type, payload, &carried)
    }

    fn assemble(
        &self,
        sender: &str,
        uid: &str,
        object_type: &ObjectType,
        payload: &[u8],
        carried: &[CarriedPart],
    ) -> FormatResult<Vec<u8>> {
        let mime = object_type.mime_type();
        let payload_part = match std::str::from_utf8(payload) {
            Ok(text) => MimePart::new(mime.as_str(), text),
            Err(_) => MimePart::new(mime.as_str(), payload.to_vec()),
        };

        let mut parts = vec![
            MimePart::new("text/plain", SUMMARY).inline(),
            payload_part.attachment(PAYLOAD_NAME),
        ];
        for extra in carried {
            let part = MimePart::new(extra.content_type.as_str(), extra.body.clone());
            parts.push(match &extra.name {
                Some(name) => part.attachment(name.as_str()),
                None => part.inline(),
            });
        }

        MessageBuilder::new()
            .from(sender)
            .to(sender)
            .subject(uid)
            .header("User-Agent", Text::new(self.user_agent.as_str()))
            .header("X-Kolab-Type", Raw::new(mime.as_str()))
            .body(MimePart::new("multipart/mixed", parts))
            .write_to_vec()
            .map_err(|e| FormatError::Envelope(e.to_string()))
    }
}
