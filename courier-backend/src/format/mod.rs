//! Value formats used by coding caches.
//!
//! A [`Format`] is object safe so caches can hold it as `Box<dyn Format>`.
//! Encoding takes a type-erased value. Decoding hands a [`Decoder`] to a
//! callback, and [`FormatExt`] wraps both in typed `serialize`/`deserialize`
//! helpers.

use std::fmt;

use courier_core::Raw;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

mod bincode;
mod json;
mod ron;

pub use self::bincode::BincodeFormat;
pub use self::json::JsonFormat;
pub use self::ron::RonFormat;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Serialization or deserialization failure.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The value could not be encoded.
    #[error(transparent)]
    Serialize(BoxError),

    /// The stored bytes could not be decoded.
    #[error(transparent)]
    Deserialize(BoxError),
}

impl FormatError {
    pub(crate) fn encode(error: impl Into<BoxError>) -> Self {
        Self::Serialize(error.into())
    }

    pub(crate) fn decode(error: impl Into<BoxError>) -> Self {
        Self::Deserialize(error.into())
    }
}

/// Which format produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// [`JsonFormat`].
    Json,
    /// [`BincodeFormat`].
    Bincode,
    /// [`RonFormat`].
    Ron,
    /// A format defined outside this crate.
    Custom(&'static str),
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatKind::Json => f.write_str("json"),
            FormatKind::Bincode => f.write_str("bincode"),
            FormatKind::Ron => f.write_str("ron"),
            FormatKind::Custom(name) => f.write_str(name),
        }
    }
}

/// Source a [`Format::decode`] callback reads one value from.
pub enum Decoder<'a, 'de> {
    /// A self-describing serde format.
    Serde(&'a mut dyn erased_serde::Deserializer<'de>),
    /// Bincode bytes. Bincode is not self-describing, so the target type
    /// drives decoding directly.
    Bincode(&'de [u8]),
}

impl Decoder<'_, '_> {
    /// Decodes one `T`.
    pub fn value<T: DeserializeOwned>(&mut self) -> Result<T, FormatError> {
        match self {
            Decoder::Serde(deserializer) => {
                erased_serde::deserialize(&mut **deserializer).map_err(FormatError::decode)
            }
            Decoder::Bincode(data) => {
                ::bincode::serde::decode_from_slice(data, ::bincode::config::standard())
                    .map(|(value, _read)| value)
                    .map_err(FormatError::decode)
            }
        }
    }
}

/// Object-safe value format.
pub trait Format: fmt::Debug + Send + Sync {
    /// Encodes `value`.
    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Raw, FormatError>;

    /// Runs `visit` against a decoder reading `data`.
    fn decode(
        &self,
        data: &[u8],
        visit: &mut dyn FnMut(&mut Decoder<'_, '_>) -> Result<(), FormatError>,
    ) -> Result<(), FormatError>;

    /// Which format this is.
    fn kind(&self) -> FormatKind;

    /// Clones this format into a box.
    fn clone_box(&self) -> Box<dyn Format>;
}

/// Typed helpers available on every [`Format`].
pub trait FormatExt: Format {
    /// Serializes `value`.
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Raw, FormatError> {
        self.encode(value)
    }

    /// Deserializes a `T` from `data`.
    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, FormatError> {
        let mut decoded = None;
        self.decode(data, &mut |decoder| {
            decoded = Some(decoder.value()?);
            Ok(())
        })?;
        decoded.ok_or_else(|| {
            FormatError::decode(format!("{} decoder produced no value", self.kind()))
        })
    }
}

impl<T: Format + ?Sized> FormatExt for T {}

impl Clone for Box<dyn Format> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl Format for Box<dyn Format> {
    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Raw, FormatError> {
        (**self).encode(value)
    }

    fn decode(
        &self,
        data: &[u8],
        visit: &mut dyn FnMut(&mut Decoder<'_, '_>) -> Result<(), FormatError>,
    ) -> Result<(), FormatError> {
        (**self).decode(data, visit)
    }

    fn kind(&self) -> FormatKind {
        (**self).kind()
    }

    fn clone_box(&self) -> Box<dyn Format> {
        (**self).clone_box()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        tags: Vec<String>,
        age: Option<u8>,
    }

    fn profile() -> Profile {
        Profile {
            name: "ada".into(),
            tags: vec!["admin".into()],
            age: Some(36),
        }
    }

    #[test]
    fn test_every_format_decodes_what_it_encodes() {
        let formats: Vec<Box<dyn Format>> =
            vec![Box::new(JsonFormat), Box::new(BincodeFormat), Box::new(RonFormat)];
        for format in formats {
            let raw = format.serialize(&profile()).unwrap();
            let decoded: Profile = format.deserialize(&raw).unwrap();
            assert_eq!(decoded, profile(), "{}", format.kind());
        }
    }

    #[test]
    fn test_json_is_plain_json() {
        let raw = JsonFormat.serialize(&profile()).unwrap();
        assert_eq!(
            std::str::from_utf8(&raw).unwrap(),
            r#"{"name":"ada","tags":["admin"],"age":36}"#
        );
    }

    #[test]
    fn test_garbage_is_a_deserialize_error() {
        let error = JsonFormat.deserialize::<Profile>(b"not json").unwrap_err();
        assert!(matches!(error, FormatError::Deserialize(_)));

        let error = JsonFormat
            .deserialize::<Profile>(br#"{"name":"ada","tags":[],"age":null} trailing"#)
            .unwrap_err();
        assert!(matches!(error, FormatError::Deserialize(_)));
    }

    #[test]
    fn test_boxed_format_keeps_kind() {
        let format: Box<dyn Format> = Box::new(RonFormat);
        assert_eq!(format.clone().kind(), FormatKind::Ron);
        assert_eq!(format.kind().to_string(), "ron");
    }
}
