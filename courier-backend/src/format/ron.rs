use courier_core::Raw;

use super::{Decoder, Format, FormatError, FormatKind};

/// RON, readable when inspecting a cache directory by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct RonFormat;

impl Format for RonFormat {
    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Raw, FormatError> {
        ron::to_string(value)
            .map(|text| Raw::from(text.into_bytes()))
            .map_err(FormatError::encode)
    }

    fn decode(
        &self,
        data: &[u8],
        visit: &mut dyn FnMut(&mut Decoder<'_, '_>) -> Result<(), FormatError>,
    ) -> Result<(), FormatError> {
        let text = std::str::from_utf8(data).map_err(FormatError::decode)?;
        let mut deserializer = ron::de::Deserializer::from_str(text).map_err(FormatError::decode)?;
        visit(&mut Decoder::Serde(
            &mut <dyn erased_serde::Deserializer>::erase(&mut deserializer),
        ))
    }

    fn kind(&self) -> FormatKind {
        FormatKind::Ron
    }

    fn clone_box(&self) -> Box<dyn Format> {
        Box::new(*self)
    }
}
