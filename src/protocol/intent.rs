//! Outbound move intents.

use serde::Serialize;

/// Request asking the coordinator to play a move.
///
/// Built, serialized and sent in one go; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundIntent {
    message_type: &'static str,
    message_subtype: &'static str,
    value: String,
}

impl OutboundIntent {
    /// A `MAKE_MOVE` command carrying the move in SAN.
    #[must_use]
    pub fn make_move(san: impl Into<String>) -> Self {
        Self {
            message_type: "COMMAND",
            message_subtype: "MAKE_MOVE",
            value: san.into(),
        }
    }

    /// The SAN carried by the intent.
    #[must_use]
    pub fn san(&self) -> &str {
        &self.value
    }

    /// Wire encoding of the intent.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_move_wire_format() {
        let intent = OutboundIntent::make_move("Nf3");
        let wire: serde_json::Value = serde_json::from_str(&intent.to_wire().unwrap()).unwrap();
        assert_eq!(
            wire,
            serde_json::json!({
                "message_type": "COMMAND",
                "message_subtype": "MAKE_MOVE",
                "value": "Nf3"
            })
        );
        assert_eq!(intent.san(), "Nf3");
    }

    #[test]
    fn test_field_order_is_stable() {
        let wire = OutboundIntent::make_move("e4").to_wire().unwrap();
        assert_eq!(
            wire,
            r#"{"message_type":"COMMAND","message_subtype":"MAKE_MOVE","value":"e4"}"#
        );
    }
}
