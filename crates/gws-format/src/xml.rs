//! XML payload engine.
//!
//! A payload is a single root element named after the object type, with a
//! `version` attribute. Each child element becomes one field:
//!
//! ```xml
//! <event version="1.0">
//!   <uid>7a1f</uid>
//!   <start-date>2024-03-01T09:00:00Z</start-date>
//!   <organizer><display-name>John</display-name></organizer>
//!   <attendee>a@example.org</attendee>
//!   <attendee>b@example.org</attendee>
//! </event>
//! ```
//!
//! Elements with children map to JSON objects, repeated elements to arrays,
//! and everything else to strings. A one-element array therefore reads back
//! as a plain string. Saving numbers, booleans, nested arrays, or empty
//! objects fails with [`FormatError::Unsavable`].

use chrono::Utc;
use gws_types::ObjectType;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::Value;
use tracing::warn;

use crate::data::ObjectData;
use crate::engine::{FormatEngine, FormatParams};
use crate::error::{FormatError, FormatResult};

const UID: &str = "uid";
const CREATION_DATE: &str = "creation-date";
const LAST_MODIFICATION_DATE: &str = "last-modification-date";
const PRODUCT_ID: &str = "product-id";

struct Frame {
    name: String,
    fields: ObjectData,
    text: String,
}

/// XML format engine for one object type.
#[derive(Clone, Debug)]
pub struct XmlFormat {
    object_type: ObjectType,
    params: FormatParams,
}

impl XmlFormat {
    pub fn new(object_type: ObjectType, params: FormatParams) -> Self {
        Self {
            object_type,
            params,
        }
    }

    /// Fields that must be present besides the uid.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self.object_type {
            ObjectType::Event => &["start-date"],
            _ => &[],
        }
    }

    fn validate(&self, data: &ObjectData) -> FormatResult<()> {
        let uid = data.get(UID).and_then(Value::as_str).unwrap_or_default();
        if uid.trim().is_empty() {
            return Err(FormatError::MissingUid);
        }
        for field in self.required_fields() {
            match data.get(*field) {
                None | Some(Value::Null) => return Err(FormatError::MissingField(field.to_string())),
                Some(Value::String(s)) if s.trim().is_empty() => {
                    return Err(FormatError::MissingField(field.to_string()))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn parse(&self, bytes: &[u8]) -> FormatResult<ObjectData> {
        let text = std::str::from_utf8(bytes).map_err(|e| FormatError::Malformed(e.to_string()))?;
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Frame> = Vec::new();
        let mut root: Option<ObjectData> = None;
        loop {
            match reader
                .read_event()
                .map_err(|e| FormatError::Malformed(e.to_string()))?
            {
                Event::Start(e) => {
                    let name = element_name(&e)?;
                    if stack.is_empty() {
                        self.check_root(&name, root.is_some())?;
                    }
                    stack.push(Frame {
                        name,
                        fields: ObjectData::new(),
                        text: String::new(),
                    });
                }
                Event::Empty(e) => {
                    let name = element_name(&e)?;
                    match stack.last_mut() {
                        Some(parent) => insert_field(&mut parent.fields, name, Value::String(String::new())),
                        None => {
                            self.check_root(&name, root.is_some())?;
                            root = Some(ObjectData::new());
                        }
                    }
                }
                Event::Text(t) => {
                    if let Some(top) = stack.last_mut() {
                        let unescaped = t
                            .unescape()
                            .map_err(|e| FormatError::Malformed(e.to_string()))?;
                        top.text.push_str(&unescaped);
                    }
                }
                Event::CData(c) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::End(_) => {
                    let frame = stack
                        .pop()
                        .ok_or_else(|| FormatError::Malformed("unbalanced end tag".into()))?;
                    match stack.last_mut() {
                        Some(parent) => {
                            let value = if frame.fields.is_empty() {
                                Value::String(frame.text)
                            } else {
                                Value::Object(frame.fields.into_iter().collect())
                            };
                            insert_field(&mut parent.fields, frame.name, value);
                        }
                        None => root = Some(frame.fields),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(FormatError::Malformed("unexpected end of document".into()));
        }
        root.ok_or_else(|| FormatError::Malformed("document has no root element".into()))
    }

    fn check_root(&self, name: &str, seen_root: bool) -> FormatResult<()> {
        if seen_root {
            return Err(FormatError::Malformed("more than one root element".into()));
        }
        if name != self.object_type.name() {
            return Err(FormatError::Malformed(format!(
                "expected <{}> root element, found <{name}>",
                self.object_type.name()
            )));
        }
        Ok(())
    }

    fn write(&self, data: &ObjectData) -> FormatResult<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        emit(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
        let mut root = BytesStart::new(self.object_type.name());
        root.push_attribute(("version", self.params.version.as_str()));
        emit(&mut writer, Event::Start(root))?;
        for (name, value) in data {
            write_value(&mut writer, name, value)?;
        }
        emit(&mut writer, Event::End(BytesEnd::new(self.object_type.name())))?;
        Ok(writer.into_inner())
    }
}

impl FormatEngine for XmlFormat {
    fn object_type(&self) -> &ObjectType {
        &self.object_type
    }

    fn load(&self, bytes: &[u8]) -> FormatResult<ObjectData> {
        let data = self.parse(bytes)?;
        self.validate(&data)?;
        Ok(data)
    }

    fn save(&self, data: &ObjectData, previous: Option<&[u8]>) -> FormatResult<Vec<u8>> {
        let mut merged = match previous.map(|bytes| self.parse(bytes)) {
            Some(Ok(previous)) => previous,
            Some(Err(e)) => {
                warn!(error = %e, "previous payload unreadable; unknown fields are dropped");
                ObjectData::new()
            }
            None => ObjectData::new(),
        };
        let created = merged.get(CREATION_DATE).cloned();

        for (name, value) in data {
            if value.is_null() {
                merged.remove(name);
            } else {
                merged.insert(name.clone(), value.clone());
            }
        }

        let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        match created {
            Some(created) => {
                merged.insert(CREATION_DATE.into(), created);
            }
            None => {
                merged
                    .entry(CREATION_DATE.into())
                    .or_insert_with(|| Value::String(now.clone()));
            }
        }
        merged.insert(LAST_MODIFICATION_DATE.into(), Value::String(now));
        merged.insert(PRODUCT_ID.into(), Value::String(self.params.product_id.clone()));

        self.validate(&merged)?;
        self.write(&merged)
    }
}

fn element_name(e: &BytesStart<'_>) -> FormatResult<String> {
    let local = e.local_name();
    std::str::from_utf8(local.as_ref())
        .map(str::to_string)
        .map_err(|err| FormatError::Malformed(err.to_string()))
}

fn insert_field(fields: &mut ObjectData, name: String, value: Value) {
    match fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(name, value);
        }
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> FormatResult<()> {
    writer
        .write_event(event)
        .map_err(|e| FormatError::Malformed(e.to_string()))
}

/// Only strings, arrays of non-array values, and non-empty objects are
/// written; anything else would read back as a different type.
fn write_value(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> FormatResult<()> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => {
            for item in items {
                if item.is_array() {
                    return Err(FormatError::Unsavable(format!("field '{name}' nests arrays")));
                }
                write_value(writer, name, item)?;
            }
            Ok(())
        }
        Value::Object(fields) if fields.is_empty() => Err(FormatError::Unsavable(format!(
            "field '{name}' is an empty object"
        ))),
        Value::Object(fields) => {
            emit(writer, Event::Start(BytesStart::new(name)))?;
            for (child, value) in fields {
                write_value(writer, child, value)?;
            }
            emit(writer, Event::End(BytesEnd::new(name)))
        }
        Value::String(s) => write_text(writer, name, s),
        Value::Bool(_) | Value::Number(_) => Err(FormatError::Unsavable(format!(
            "field '{name}' must be a string, got {value}"
        ))),
    }
}

fn write_text(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> FormatResult<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}
