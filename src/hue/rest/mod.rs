use std::time::Duration;

use async_trait::async_trait;
use hyper::Uri;
use thiserror::Error;

use self::light::{get_hue_lights, put_hue_light, LightCommand, Lights};
use crate::{
    protocols::http::{HyperHttpClient, RequestError},
    settings::Settings,
};

pub mod light;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("could not reach Hue bridge: {0}")]
    Transport(RequestError),

    #[error("malformed response from Hue bridge: {0}")]
    Malformed(String),

    #[error("Hue bridge rejected the request")]
    Rejected(serde_json::Value),

    #[error("invalid Hue bridge uri: {0}")]
    InvalidUri(#[from] hyper::http::uri::InvalidUri),
}

impl BridgeError {
    /// Connection and timeout failures, as opposed to the bridge answering
    /// with something we can't use.
    pub fn is_transport(&self) -> bool {
        matches!(self, BridgeError::Transport(_) | BridgeError::InvalidUri(_))
    }
}

impl From<RequestError> for BridgeError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::Decode(e) => BridgeError::Malformed(e.to_string()),
            e => BridgeError::Transport(e),
        }
    }
}

/// Operations the sync engine needs from the Hue bridge.
#[async_trait]
pub trait HueBridge: Send + Sync + 'static {
    async fn get_lights(&self) -> Result<Lights, BridgeError>;

    async fn set_light_state(&self, id: &str, command: &LightCommand) -> Result<(), BridgeError>;
}

/// Hue bridge v1 REST client.
#[derive(Clone)]
pub struct HueClient {
    http: HyperHttpClient,
    addr: String,
    username: String,
    pub(crate) timeout: Duration,
}

impl HueClient {
    pub fn new(settings: &Settings, http: &HyperHttpClient) -> Self {
        HueClient {
            http: http.clone(),
            addr: settings.hue_bridge.addr.clone(),
            username: settings.hue_bridge.username.clone(),
            timeout: settings.request_timeout(),
        }
    }

    pub(crate) fn uri(&self, path: &str) -> Result<Uri, BridgeError> {
        let uri = format!("http://{}/api/{}{}", self.addr, self.username, path).parse()?;

        Ok(uri)
    }
}

#[async_trait]
impl HueBridge for HueClient {
    async fn get_lights(&self) -> Result<Lights, BridgeError> {
        get_hue_lights(self, &self.http).await
    }

    async fn set_light_state(&self, id: &str, command: &LightCommand) -> Result<(), BridgeError> {
        put_hue_light(self, &self.http, id, command).await
    }
}

#[cfg(test)]
mod tests {
    use crate::protocols::http::mk_hyper_http_client;

    use super::*;

    fn client(addr: &str) -> HueClient {
        HueClient {
            http: mk_hyper_http_client(),
            addr: addr.to_string(),
            username: "newdeveloper".to_string(),
            timeout: Duration::from_millis(1500),
        }
    }

    #[tokio::test]
    async fn test_light_state_uri() {
        let uri = client("192.168.1.10").uri("/lights/3/state").unwrap();

        assert_eq!(
            uri.to_string(),
            "http://192.168.1.10/api/newdeveloper/lights/3/state"
        );
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let result = client("bad address").uri("/lights");

        assert!(matches!(result, Err(BridgeError::InvalidUri(_))));
    }

    #[test]
    fn test_error_classification() {
        let timeout = BridgeError::from(RequestError::Timeout(Duration::from_secs(1)));
        let rejected = BridgeError::Rejected(serde_json::json!({"description": "nope"}));

        assert!(timeout.is_transport());
        assert!(!rejected.is_transport());
    }
}
