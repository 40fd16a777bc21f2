//! Payload Transforms
//!
//! Converts a submitted message into the JSON body sent to the endpoint.

use serde_json::{json, Value};

use crate::dispatch::error::DeliveryError;

/// Converts a message into a wire payload
pub trait PayloadTransform: Send + Sync {
    fn transform(&self, message: &str) -> Result<Value, DeliveryError>;
}

impl<F> PayloadTransform for F
where
    F: Fn(&str) -> Result<Value, DeliveryError> + Send + Sync,
{
    fn transform(&self, message: &str) -> Result<Value, DeliveryError> {
        self(message)
    }
}

/// Default transform: `{"message": <message>}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMessageTransform;

impl PayloadTransform for JsonMessageTransform {
    fn transform(&self, message: &str) -> Result<Value, DeliveryError> {
        Ok(json!({ "message": message }))
    }
}
