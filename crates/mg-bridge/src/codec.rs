//! Binary wire codec
//!
//! Bodies are bincode-encoded structs. The action kind travels next to the
//! body, never inside it, so the kind alone selects the schema to decode.

use mg_core::{
    ActionKind, Error, EventBody, LogEvent, OutputEvent, PlayEvent, PluginEvent, ResourceEvent,
    Result,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

/// Encode only the inner struct of an event body
pub fn encode_event(body: &EventBody) -> Result<Vec<u8>> {
    match body {
        EventBody::Resource(e) => encode(e),
        EventBody::Output(e) => encode(e),
        EventBody::Plugin(e) => encode(e),
        EventBody::Play(e) => encode(e),
        EventBody::Log(e) => encode(e),
    }
}

/// Decode an event body using the schema its kind implies
pub fn decode_event(kind: ActionKind, bytes: &[u8]) -> Result<EventBody> {
    let body = match kind {
        ActionKind::ResourceAdd
        | ActionKind::ResourceRemove
        | ActionKind::ResourceStart
        | ActionKind::ResourceEnd => EventBody::Resource(decode::<ResourceEvent>(bytes)?),
        ActionKind::OutputAdd | ActionKind::OutputRemove | ActionKind::OutputError => {
            EventBody::Output(decode::<OutputEvent>(bytes)?)
        }
        ActionKind::PluginAdd | ActionKind::PluginRemove | ActionKind::PluginUpdate => {
            EventBody::Plugin(decode::<PluginEvent>(bytes)?)
        }
        ActionKind::PlayStop | ActionKind::PlayEnd => EventBody::Play(decode::<PlayEvent>(bytes)?),
        ActionKind::EngineLog => EventBody::Log(decode::<LogEvent>(bytes)?),
    };
    Ok(body)
}

/// Resolve a wire code, rejecting codes this build does not know
pub fn kind_from_code(code: u32) -> Result<ActionKind> {
    ActionKind::from_code(code)
        .ok_or_else(|| Error::invalid_argument(format!("unknown action kind code {}", code)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_selects_schema() {
        let body = EventBody::Plugin(PluginEvent {
            path: "show-time".into(),
            unique: "p1".into(),
            params: [("fontfile".to_string(), "/tmp/font.ttf".to_string())].into(),
            error: "plugin file not found".into(),
        });
        let bytes = encode_event(&body).unwrap();

        let decoded = decode_event(ActionKind::PluginAdd, &bytes).unwrap();
        assert_eq!(decoded, body);
        assert_eq!(decoded.error(), Some("plugin file not found"));
    }

    #[test]
    fn test_truncated_body_is_a_codec_error() {
        let bytes = encode_event(&EventBody::Output(OutputEvent {
            path: "rtmp://h/live".into(),
            unique: "o1".into(),
            error: String::new(),
        }))
        .unwrap();

        let err = decode_event(ActionKind::OutputAdd, &bytes[..3]).unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }

    #[test]
    fn test_unknown_code() {
        assert!(kind_from_code(ActionKind::PlayStop.code()).is_ok());
        assert!(matches!(kind_from_code(7777), Err(Error::InvalidArgument(_))));
    }
}
