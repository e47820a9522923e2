use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::protocols::http::{mk_get_request, mk_put_request, HyperHttpClient};

use super::{BridgeError, HueClient};

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Hs,
    Ct,
    Xy,
    #[serde(other)]
    Unknown,
}

/// Raw light state as reported by `GET /lights`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LightState {
    #[serde(default)]
    pub on: bool,
    pub bri: Option<u8>,
    pub hue: Option<u16>,
    pub sat: Option<u8>,
    pub ct: Option<u16>,
    pub colormode: Option<ColorMode>,
    #[serde(default)]
    pub reachable: bool,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LightData {
    pub state: LightState,
}

pub type Lights = BTreeMap<String, LightData>;

/// Sparse state patch sent with `PUT /lights/{id}/state`.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LightCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<u16>,

    // transition time measured in deciseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transitiontime: Option<u16>,
}

/// The bridge answers errors with a `[{"error": {...}}]` array instead of
/// the usual id -> light object.
pub fn parse_lights_response(response: serde_json::Value) -> Result<Lights, BridgeError> {
    match response {
        serde_json::Value::Object(_) => serde_path_to_error::deserialize(response)
            .map_err(|e| BridgeError::Malformed(e.to_string())),
        serde_json::Value::Array(mut items) if !items.is_empty() => {
            let detail = items
                .swap_remove(0)
                .get_mut("error")
                .map(serde_json::Value::take)
                .unwrap_or(serde_json::Value::Null);
            Err(BridgeError::Rejected(detail))
        }
        other => Err(BridgeError::Rejected(other)),
    }
}

/// A write succeeded only if every per-property result carries `success`.
pub fn check_put_response(response: serde_json::Value) -> Result<(), BridgeError> {
    let all_success = match &response {
        serde_json::Value::Array(items) => items.iter().all(|item| item.get("success").is_some()),
        _ => false,
    };

    if all_success {
        Ok(())
    } else {
        Err(BridgeError::Rejected(response))
    }
}

pub async fn get_hue_lights(
    client: &HueClient,
    http: &HyperHttpClient,
) -> Result<Lights, BridgeError> {
    let uri = client.uri("/lights")?;
    let response: serde_json::Value = mk_get_request(http, &uri, client.timeout).await?;

    parse_lights_response(response)
}

pub async fn put_hue_light(
    client: &HueClient,
    http: &HyperHttpClient,
    id: &str,
    command: &LightCommand,
) -> Result<(), BridgeError> {
    let uri = client.uri(&format!("/lights/{}/state", id))?;
    let response: serde_json::Value = mk_put_request(http, &uri, command, client.timeout).await?;

    check_put_response(response)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_lights() {
        let lights = parse_lights_response(json!({
            "1": {
                "state": {"on": true, "bri": 127, "ct": 300, "colormode": "ct", "reachable": true},
                "name": "Hallway",
                "type": "Color temperature light"
            },
            "2": {
                "state": {"on": false, "reachable": false}
            }
        }))
        .unwrap();

        assert_eq!(lights.len(), 2);
        assert_eq!(
            lights["1"].state,
            LightState {
                on: true,
                bri: Some(127),
                ct: Some(300),
                colormode: Some(ColorMode::Ct),
                reachable: true,
                ..Default::default()
            }
        );
        assert!(!lights["2"].state.reachable);
    }

    #[test]
    fn test_unknown_colormode() {
        let lights = parse_lights_response(json!({
            "4": {"state": {"on": true, "bri": 1, "colormode": "rgbw", "reachable": true}}
        }))
        .unwrap();

        assert_eq!(lights["4"].state.colormode, Some(ColorMode::Unknown));
    }

    #[test]
    fn test_error_array_is_rejected() {
        let result = parse_lights_response(json!([
            {"error": {"type": 1, "address": "/lights", "description": "unauthorized user"}}
        ]));

        match result {
            Err(BridgeError::Rejected(detail)) => {
                assert_eq!(detail["description"], "unauthorized user")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_scalar_response_is_rejected() {
        assert!(matches!(
            parse_lights_response(json!("nope")),
            Err(BridgeError::Rejected(_))
        ));
        assert!(matches!(
            parse_lights_response(json!([])),
            Err(BridgeError::Rejected(_))
        ));
    }

    #[test]
    fn test_malformed_light_state() {
        let result = parse_lights_response(json!({"1": {"state": {"bri": "high"}}}));

        assert!(matches!(result, Err(BridgeError::Malformed(_))));
    }

    #[test]
    fn test_put_response_requires_success_for_every_property() {
        assert!(check_put_response(json!([
            {"success": {"/lights/1/state/on": true}},
            {"success": {"/lights/1/state/bri": 127}}
        ]))
        .is_ok());

        assert!(check_put_response(json!([
            {"success": {"/lights/1/state/on": true}},
            {"error": {"type": 201, "description": "parameter, bri, is not modifiable"}}
        ]))
        .is_err());

        assert!(check_put_response(json!({"success": true})).is_err());
    }

    #[test]
    fn test_empty_put_response_succeeds() {
        assert!(check_put_response(json!([])).is_ok());
    }

    #[test]
    fn test_command_serializes_only_set_fields() {
        let command = LightCommand {
            on: Some(true),
            bri: Some(127),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({"on": true, "bri": 127})
        );
        assert_eq!(
            serde_json::to_value(LightCommand::default()).unwrap(),
            json!({})
        );
    }
}
