use serde::{Deserialize, Serialize};

/// `val` inside a structured control message.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Power(bool),
    Level(f64),
    Unrecognized(serde_json::Value),
}

/// Numeric field inside a structured control message. A value of the wrong
/// type only drops that field, not the whole message.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ControlNumber {
    Number(f64),
    Unrecognized(serde_json::Value),
}

impl ControlNumber {
    pub fn number(&self) -> Option<f64> {
        match self {
            ControlNumber::Number(n) => Some(*n),
            ControlNumber::Unrecognized(_) => None,
        }
    }
}

/// Structured control message, every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ControlFields {
    /// Power state or brightness level (0.0 - 1.0)
    pub val: Option<ControlValue>,

    /// Hue (0.0 - 1.0)
    pub hue: Option<ControlNumber>,

    /// Saturation (0.0 - 1.0)
    pub sat: Option<ControlNumber>,

    /// Colour temperature in mired, passed through as-is
    pub ct: Option<ControlNumber>,

    /// Transition time in milliseconds
    pub transitiontime: Option<ControlNumber>,
}

/// Body of a message received on `<name>/set/<id>`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ControlPayload {
    Power(bool),
    Level(f64),
    // Arrays must not reach `Fields`, serde would map them onto the struct positionally
    List(Vec<serde_json::Value>),
    Fields(ControlFields),
    Unrecognized(serde_json::Value),
}

impl ControlPayload {
    /// Anything that isn't valid JSON is kept around as an unrecognized
    /// string so it still results in a (no-op) bridge write.
    pub fn from_slice(payload: &[u8]) -> ControlPayload {
        serde_json::from_slice(payload).unwrap_or_else(|_| {
            ControlPayload::Unrecognized(serde_json::Value::String(
                String::from_utf8_lossy(payload).into_owned(),
            ))
        })
    }
}

/// A control payload addressed to one light.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlMessage {
    pub id: String,
    pub payload: ControlPayload,
}

/// Body of a message published on `<name>/status/<id>`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatusPayload {
    HueSaturation {
        val: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        hue: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sat: Option<f64>,
    },
    ColorTemperature {
        val: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        ct: Option<u16>,
    },
    Switch { val: bool },
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_bare_values_are_tagged() {
        assert_eq!(ControlPayload::from_slice(b"true"), ControlPayload::Power(true));
        assert_eq!(ControlPayload::from_slice(b"0.25"), ControlPayload::Level(0.25));
        assert_eq!(ControlPayload::from_slice(b"1"), ControlPayload::Level(1.0));
    }

    #[test]
    fn test_structured_payload() {
        let payload = ControlPayload::from_slice(br#"{"val": false, "hue": 0.5}"#);

        assert_eq!(
            payload,
            ControlPayload::Fields(ControlFields {
                val: Some(ControlValue::Power(false)),
                hue: Some(ControlNumber::Number(0.5)),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_unknown_val_type_keeps_other_fields() {
        let payload = ControlPayload::from_slice(br#"{"val": "on", "sat": 1}"#);

        assert_eq!(
            payload,
            ControlPayload::Fields(ControlFields {
                val: Some(ControlValue::Unrecognized(json!("on"))),
                sat: Some(ControlNumber::Number(1.0)),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_wrong_numeric_field_type_keeps_other_fields() {
        let payload = ControlPayload::from_slice(br#"{"val": 0.5, "hue": "red"}"#);

        assert_eq!(
            payload,
            ControlPayload::Fields(ControlFields {
                val: Some(ControlValue::Level(0.5)),
                hue: Some(ControlNumber::Unrecognized(json!("red"))),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_non_json_payload_is_unrecognized() {
        assert_eq!(
            ControlPayload::from_slice(b"on"),
            ControlPayload::Unrecognized(json!("on"))
        );
        assert_eq!(
            ControlPayload::from_slice(br#""on""#),
            ControlPayload::Unrecognized(json!("on"))
        );
        assert_eq!(
            ControlPayload::from_slice(b"[1, 2]"),
            ControlPayload::List(vec![json!(1), json!(2)])
        );
    }

    #[test]
    fn test_status_payload_shapes() {
        let hs = StatusPayload::HueSaturation {
            val: 0.5,
            hue: Some(0.25),
            sat: Some(1.0),
        };
        let ct = StatusPayload::ColorTemperature {
            val: 0.0,
            ct: Some(300),
        };
        let ct_unknown = StatusPayload::ColorTemperature { val: 1.0, ct: None };
        let switch = StatusPayload::Switch { val: true };

        assert_eq!(
            serde_json::to_value(hs).unwrap(),
            json!({"val": 0.5, "hue": 0.25, "sat": 1.0})
        );
        assert_eq!(serde_json::to_value(ct).unwrap(), json!({"val": 0.0, "ct": 300}));
        assert_eq!(serde_json::to_value(ct_unknown).unwrap(), json!({"val": 1.0}));
        assert_eq!(serde_json::to_value(switch).unwrap(), json!({"val": true}));
    }
}
