use courier_backend::format::{BincodeFormat, Format, JsonFormat, RonFormat};
use serde::{Deserialize, Serialize};

/// Encoding of cached values.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum ValueSerialization {
    /// JSON (default).
    #[default]
    Json,
    /// Bincode.
    Bincode,
    /// RON.
    Ron,
}

impl ValueSerialization {
    /// The [`Format`] implementing this encoding.
    pub fn to_format(self) -> Box<dyn Format> {
        match self {
            ValueSerialization::Json => Box::new(JsonFormat),
            ValueSerialization::Bincode => Box::new(BincodeFormat),
            ValueSerialization::Ron => Box::new(RonFormat),
        }
    }
}

/// How values are turned into stored bytes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub struct ValueFormat {
    /// Value encoding.
    #[serde(default)]
    pub format: ValueSerialization,
    /// Prefix added to every key, scoping the cache to one application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}
