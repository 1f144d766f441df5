//! MIME part trees of stored documents.
//!
//! Part ids follow the server numbering: the message itself is `0`, its
//! direct children `1`, `2`, ..., and nested parts `1.1`, `1.2`, ...

use mailparse::{MailHeaderMap, ParsedMail};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

const ROOT_PART: &str = "0";

/// One node of a message part tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartInfo {
    pub part_id: String,
    /// Lowercased MIME type, e.g. `text/plain`.
    pub content_type: String,
    /// File name from the disposition, or the content-type `name` parameter.
    pub name: Option<String>,
    /// Lowercased disposition type (`inline`, `attachment`), if present.
    pub disposition: Option<String>,
    pub children: Vec<PartInfo>,
}

impl PartInfo {
    fn from_parsed(mail: &ParsedMail<'_>, part_id: String) -> Self {
        let disposition_header = mail.headers.get_first_value("Content-Disposition");
        let disposition = disposition_header.as_deref().and_then(|value| {
            let token = value.split(';').next()?.trim().to_ascii_lowercase();
            (!token.is_empty()).then_some(token)
        });
        let name = disposition_header
            .as_ref()
            .and_then(|_| mail.get_content_disposition().params.get("filename").cloned())
            .or_else(|| mail.ctype.params.get("name").cloned());
        let children = mail
            .subparts
            .iter()
            .enumerate()
            .map(|(index, sub)| PartInfo::from_parsed(sub, child_id(&part_id, index)))
            .collect();
        Self {
            part_id,
            content_type: mail.ctype.mimetype.to_ascii_lowercase(),
            name,
            disposition,
            children,
        }
    }

    pub fn is_multipart(&self) -> bool {
        self.content_type.starts_with("multipart/")
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a PartInfo>) {
        out.push(self);
        for child in &self.children {
            child.collect(out);
        }
    }
}

/// Part tree plus the envelope headers the engine looks at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStructure {
    pub subject: Option<String>,
    /// Value of the `X-Kolab-Type` header, lowercased.
    pub kolab_type: Option<String>,
    pub root: PartInfo,
}

impl MessageStructure {
    /// Parse the structure of a raw RFC 822 document.
    pub fn parse(raw: &[u8]) -> StoreResult<Self> {
        let mail = mailparse::parse_mail(raw).map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok(Self {
            subject: mail.headers.get_first_value("Subject"),
            kolab_type: mail
                .headers
                .get_first_value("X-Kolab-Type")
                .map(|v| v.trim().to_ascii_lowercase()),
            root: PartInfo::from_parsed(&mail, ROOT_PART.to_string()),
        })
    }

    /// Structure reported for a document that is not valid MIME: a single
    /// opaque part and no headers.
    pub fn opaque() -> Self {
        Self {
            subject: None,
            kolab_type: None,
            root: PartInfo {
                part_id: ROOT_PART.to_string(),
                content_type: "application/octet-stream".to_string(),
                name: None,
                disposition: None,
                children: Vec::new(),
            },
        }
    }

    /// All parts, depth-first, starting with the root.
    pub fn parts(&self) -> Vec<&PartInfo> {
        let mut out = Vec::new();
        self.root.collect(&mut out);
        out
    }

    pub fn find(&self, part_id: &str) -> Option<&PartInfo> {
        self.parts().into_iter().find(|p| p.part_id == part_id)
    }

    /// Parts that carry content rather than other parts.
    pub fn leaves(&self) -> Vec<&PartInfo> {
        self.parts()
            .into_iter()
            .filter(|p| p.children.is_empty())
            .collect()
    }
}

/// The transfer-decoded body of one part of a raw document.
///
/// Returns `Ok(None)` when the document has no such part.
pub fn extract_part(raw: &[u8], part_id: &str) -> StoreResult<Option<Vec<u8>>> {
    let mail = mailparse::parse_mail(raw).map_err(|e| StoreError::Parse(e.to_string()))?;
    match find_parsed(&mail, ROOT_PART, part_id) {
        Some(part) => part
            .get_body_raw()
            .map(Some)
            .map_err(|e| StoreError::Parse(e.to_string())),
        None => Ok(None),
    }
}

fn find_parsed<'a, 'b>(
    mail: &'a ParsedMail<'b>,
    id: &str,
    wanted: &str,
) -> Option<&'a ParsedMail<'b>> {
    if id == wanted {
        return Some(mail);
    }
    mail.subparts.iter().enumerate().find_map(|(index, sub)| {
        let sub_id = child_id(id, index);
        let descend = wanted == sub_id || wanted.starts_with(&format!("{sub_id}."));
        if descend {
            find_parsed(sub, &sub_id, wanted)
        } else {
            None
        }
    })
}

fn child_id(parent: &str, index: usize) -> String {
    if parent == ROOT_PART {
        (index + 1).to_string()
    } else {
        format!("{parent}.{}", index + 1)
    }
}
