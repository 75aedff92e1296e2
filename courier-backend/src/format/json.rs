use courier_core::Raw;

use super::{Decoder, Format, FormatError, FormatKind};

/// JSON, the default value format.
///
/// Trailing input after the value is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Raw, FormatError> {
        serde_json::to_vec(value)
            .map(Raw::from)
            .map_err(FormatError::encode)
    }

    fn decode(
        &self,
        data: &[u8],
        visit: &mut dyn FnMut(&mut Decoder<'_, '_>) -> Result<(), FormatError>,
    ) -> Result<(), FormatError> {
        let mut deserializer = serde_json::Deserializer::from_slice(data);
        visit(&mut Decoder::Serde(
            &mut <dyn erased_serde::Deserializer>::erase(&mut deserializer),
        ))?;
        deserializer.end().map_err(FormatError::decode)
    }

    fn kind(&self) -> FormatKind {
        FormatKind::Json
    }

    fn clone_box(&self) -> Box<dyn Format> {
        Box::new(*self)
    }
}
