//! Lenient decoding of client-supplied scalar fields.
//!
//! Game scripts send ids such as the user id, place id or asset id as JSON
//! numbers, while admin panels tend to send the same values as strings. The
//! relay treats all of them as opaque strings, so both forms are accepted and
//! a number is kept as its decimal text.

use serde::{Deserialize, Deserializer};

/// A string or a number as sent on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(serde_json::Number),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(text) => text,
            WireId::Number(number) => number.to_string(),
        }
    }
}

/// `deserialize_with` helper for a required string-or-number field.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    WireId::deserialize(deserializer).map(String::from)
}

/// `deserialize_with` helper for an optional string-or-number field.
///
/// Pair it with `#[serde(default)]` so an absent key becomes `None`.
pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WireId>::deserialize(deserializer)?.map(String::from))
}
