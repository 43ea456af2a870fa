//! XML documents read into a `serde_json::Value` tree.
//!
//! The tree follows quick-xml's serde naming so the same types serialize and
//! deserialize symmetrically:
//!
//! - the root element's name is dropped, its content is the value;
//! - an element with only text becomes a string (an empty element is `""`);
//! - child elements become object fields, repeated children an array;
//! - attributes become `@name` fields, text mixed with children `$text`.
//!
//! Scalars stay strings; the lenient deserializer parses them into numbers
//! and booleans where the target type asks for one.

use std::mem;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::map::Entry;
use serde_json::{Map, Value};

use crate::error::BoxError;

#[derive(Default)]
struct Element {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, BoxError> {
        let mut element = Element {
            name: utf8(start.local_name().as_ref())?,
            ..Element::default()
        };
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = attribute.key;
            if key.as_ref() == b"xmlns" || key.prefix().is_some_and(|p| p.as_ref() == b"xmlns") {
                continue;
            }
            let name = format!("@{}", utf8(key.local_name().as_ref())?);
            let value = attribute.unescape_value()?.into_owned();
            element.fields.insert(name, Value::String(value));
        }
        Ok(element)
    }

    fn add_child(&mut self, name: String, value: Value) {
        match self.fields.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(items) => items.push(value),
                first => *first = Value::Array(vec![mem::take(first), value]),
            },
        }
    }

    fn finish(mut self) -> (String, Value) {
        let value = if self.fields.is_empty() {
            Value::String(self.text)
        } else {
            if !self.text.is_empty() {
                self.fields.insert("$text".to_string(), Value::String(self.text));
            }
            Value::Object(self.fields)
        };
        (self.name, value)
    }
}

fn utf8(bytes: &[u8]) -> Result<String, BoxError> {
    Ok(std::str::from_utf8(bytes)?.to_string())
}

/// Parse `body` and return the content of its root element.
pub(crate) fn to_value(body: &str) -> Result<Value, BoxError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut open: Vec<Element> = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(start) => open.push(Element::open(&start)?),
            Event::Empty(start) => {
                let (name, value) = Element::open(&start)?.finish();
                match open.last_mut() {
                    Some(parent) => parent.add_child(name, value),
                    None => return Ok(value),
                }
            }
            Event::End(_) => {
                let Some(element) = open.pop() else {
                    continue;
                };
                let (name, value) = element.finish();
                match open.last_mut() {
                    Some(parent) => parent.add_child(name, value),
                    None => return Ok(value),
                }
            }
            Event::Text(text) => {
                if let Some(element) = open.last_mut() {
                    element.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(element) = open.last_mut() {
                    element.text.push_str(&utf8(&data)?);
                }
            }
            Event::Eof => return Ok(Value::Null),
            _ => {}
        }
    }
}
