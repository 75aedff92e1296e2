use courier_core::Raw;

use super::{Decoder, Format, FormatError, FormatKind};

/// Compact binary values, bincode's standard configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeFormat;

impl Format for BincodeFormat {
    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Raw, FormatError> {
        ::bincode::serde::encode_to_vec(value, ::bincode::config::standard())
            .map(Raw::from)
            .map_err(FormatError::encode)
    }

    fn decode(
        &self,
        data: &[u8],
        visit: &mut dyn FnMut(&mut Decoder<'_, '_>) -> Result<(), FormatError>,
    ) -> Result<(), FormatError> {
        visit(&mut Decoder::Bincode(data))
    }

    fn kind(&self) -> FormatKind {
        FormatKind::Bincode
    }

    fn clone_box(&self) -> Box<dyn Format> {
        Box::new(*self)
    }
}
