// JSON frames on the alert transport.
//
// Frames look like `{"type": "new_social", "data": { ...report... }}`, the shape
// existing producers already emit. Decoding is lenient about what it rejects:
// callers treat every error as "ignore this frame" and keep the channel open.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::model::{AlertEvent, AlertKind};
use crate::core::model::DisasterReport;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not a JSON object: {0}")]
    NotJson(#[source] serde_json::Error),
    #[error("frame has no type")]
    MissingKind,
    #[error("unknown frame type: {0}")]
    UnknownKind(String),
    #[error("frame has no data")]
    MissingPayload,
    #[error("frame data is not a report: {0}")]
    BadPayload(#[source] serde_json::Error),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    data: Option<Value>,
}

pub fn encode(event: &AlertEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

pub fn decode(text: &str) -> Result<AlertEvent, FrameError> {
    let raw: RawFrame = serde_json::from_str(text).map_err(FrameError::NotJson)?;
    let kind_name = raw.kind.ok_or(FrameError::MissingKind)?;
    let kind = AlertKind::from_wire_name(&kind_name).ok_or(FrameError::UnknownKind(kind_name))?;

    let data = match raw.data {
        Some(Value::Null) | None => return Err(FrameError::MissingPayload),
        Some(data) => data,
    };
    let payload: DisasterReport = serde_json::from_value(data).map_err(FrameError::BadPayload)?;

    Ok(AlertEvent { kind, payload })
}
