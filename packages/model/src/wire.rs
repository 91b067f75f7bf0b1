//! # Wire Shape
//!
//! The remote store speaks an externally tagged union: every fragment is a
//! single-entry object such as `{"Text": "hello"}` or `{"Image": "cat.png"}`.
//!
//! Deserialization is strict. An unknown tag, an empty or multi-entry object,
//! or a non-string payload fails with [`ModelError::MalformedFragment`]
//! instead of silently dropping content.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Fragment, ModelError, Note};

pub const TEXT_TAG: &str = "Text";
pub const IMAGE_TAG: &str = "Image";

/// Generic typed-union fragment as it travels over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireFragment(pub BTreeMap<String, Value>);

impl WireFragment {
    pub fn tagged(tag: impl Into<String>, payload: impl Into<Value>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(tag.into(), payload.into());
        Self(entries)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNote {
    pub content: Vec<WireFragment>,
    pub date: String,
}

pub fn serialize(note: &Note) -> WireNote {
    let content = note
        .fragments
        .iter()
        .map(|fragment| match fragment {
            Fragment::Text(text) => WireFragment::tagged(TEXT_TAG, text.as_str()),
            Fragment::Image(image_ref) => WireFragment::tagged(IMAGE_TAG, image_ref.as_str()),
        })
        .collect();

    WireNote {
        content,
        date: note
            .last_modified
            .to_rfc3339_opts(SecondsFormat::AutoSi, true),
    }
}

pub fn deserialize(wire: &WireNote) -> Result<Note, ModelError> {
    let fragments = wire
        .content
        .iter()
        .enumerate()
        .map(|(index, fragment)| deserialize_fragment(index, fragment))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Note {
        fragments,
        last_modified: parse_timestamp(&wire.date)?,
    })
}

fn deserialize_fragment(index: usize, fragment: &WireFragment) -> Result<Fragment, ModelError> {
    let mut entries = fragment.0.iter();

    let (tag, payload) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        (None, _) => return Err(ModelError::malformed(index, "", "empty fragment object")),
        (Some((tag, _)), Some((other, _))) => {
            return Err(ModelError::malformed(
                index,
                tag.as_str(),
                format!("fragment is tagged more than once (also {other})"),
            ))
        }
    };

    let payload = payload
        .as_str()
        .ok_or_else(|| ModelError::malformed(index, tag.as_str(), "payload is not a string"))?;

    match tag.as_str() {
        TEXT_TAG => Ok(Fragment::Text(payload.to_string())),
        IMAGE_TAG => Ok(Fragment::Image(payload.to_string())),
        _ => Err(ModelError::malformed(index, tag.as_str(), "unrecognized variant")),
    }
}

/// RFC 3339 is what we write; RFC 2822 is accepted for older stores
fn parse_timestamp(date: &str) -> Result<DateTime<Utc>, ModelError> {
    DateTime::parse_from_rfc3339(date)
        .or_else(|_| DateTime::parse_from_rfc2822(date))
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| ModelError::MalformedTimestamp(date.to_string()))
}
