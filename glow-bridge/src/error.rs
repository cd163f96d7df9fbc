/// Errors raised while turning one inbound message into entity updates.
///
/// None of these abort the pipeline. `FieldMissing` means a measurement does
/// not apply to the payload it was offered, `MalformedPayload` drops the
/// message, `InvalidTimestamp` only skips the reset-boundary update.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("field missing: {0}")]
    FieldMissing(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid time zone '{0}'")]
    InvalidTimeZone(String),
    #[error("invalid topic rule: {0}")]
    InvalidTopicRule(String),
}
