use prost::Message;
use prost_reflect::{
    DeserializeOptions, DynamicMessage, MessageDescriptor, SerializeOptions,
};

use crate::ports::codec::{CodecError, WireCodec};

/// [`WireCodec`] backed by `prost-reflect`: protobuf binary on the wire and
/// the canonical protobuf JSON mapping as text.
///
/// Unknown JSON fields are rejected rather than dropped.
#[derive(Debug, Clone, Default)]
pub struct ProtobufJsonCodec;

impl ProtobufJsonCodec {
    pub fn new() -> Self {
        Self
    }
}

impl WireCodec for ProtobufJsonCodec {
    fn decode_text(
        &self,
        descriptor: &MessageDescriptor,
        payload: &[u8],
    ) -> Result<DynamicMessage, CodecError> {
        let mut deserializer = serde_json::Deserializer::from_slice(payload);
        let message = DynamicMessage::deserialize_with_options(
            descriptor.clone(),
            &mut deserializer,
            &DeserializeOptions::new().deny_unknown_fields(true),
        )?;
        deserializer.end()?;
        Ok(message)
    }

    fn encode_binary(&self, message: &DynamicMessage) -> Vec<u8> {
        message.encode_to_vec()
    }

    fn decode_binary(
        &self,
        descriptor: &MessageDescriptor,
        payload: &[u8],
    ) -> Result<DynamicMessage, CodecError> {
        Ok(DynamicMessage::decode(descriptor.clone(), payload)?)
    }

    fn encode_text(
        &self,
        message: &DynamicMessage,
        emit_defaults: bool,
    ) -> Result<Vec<u8>, CodecError> {
        let options = SerializeOptions::new().skip_default_fields(!emit_defaults);
        let mut serializer = serde_json::Serializer::new(Vec::new());
        message.serialize_with_options(&mut serializer, &options)?;
        Ok(serializer.into_inner())
    }
}
