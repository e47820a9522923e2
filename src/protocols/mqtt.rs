use std::{sync::Arc, time::Duration};

use color_eyre::Result;
use eyre::eyre;
use hyper::Uri;
use log::{debug, info, warn};
use rumqttc::{AsyncClient, LastWill, MqttOptions, Outgoing, QoS};
use tokio::{
    sync::{mpsc::UnboundedSender, Mutex},
    task::{self, JoinHandle},
};

use crate::{
    mqtt::{
        payload::{ControlMessage, ControlPayload},
        topics::Topics,
    },
    settings::Settings,
    sync::engine::StatusPublisher,
};

// A poll publishes two messages per light, all at once
const REQUEST_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, PartialEq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,
}

/// Parses `scheme://[user[:password]@]host[:port]`.
pub fn broker_address(url: &str) -> Result<BrokerAddress> {
    let uri: Uri = url.parse()?;

    // TLS and websocket transports aren't set up
    match uri.scheme_str() {
        Some("mqtt") | Some("tcp") => {}
        scheme => {
            return Err(eyre!(
                "Unsupported MQTT url scheme {:?} in {}, expected mqtt:// or tcp://",
                scheme.unwrap_or_default(),
                url
            ))
        }
    }

    let host = uri
        .host()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| eyre!("MQTT url {} has no host", url))?;

    let credentials = uri
        .authority()
        .and_then(|authority| authority.as_str().rsplit_once('@'))
        .map(|(user_info, _)| match user_info.split_once(':') {
            Some((user, password)) => (user.to_string(), password.to_string()),
            None => (user_info.to_string(), String::new()),
        });

    Ok(BrokerAddress {
        host: host.to_string(),
        port: uri.port_u16().unwrap_or(1883),
        credentials,
    })
}

#[derive(Clone)]
pub struct MqttClient {
    pub client: AsyncClient,
    topics: Topics,
    event_loop: Arc<Mutex<Option<JoinHandle<()>>>>,
}

pub fn mk_mqtt_client(
    settings: &Settings,
    control_tx: UnboundedSender<ControlMessage>,
) -> Result<MqttClient> {
    let broker = broker_address(&settings.mqtt.url)?;
    let topics = Topics::new(settings.mqtt.name.clone());

    let mut options = MqttOptions::new(settings.mqtt.name.clone(), broker.host, broker.port);
    options.set_keep_alive(Duration::from_secs(settings.mqtt.keep_alive_seconds));
    options.set_last_will(LastWill::new(
        topics.bridge_online(),
        "false",
        QoS::AtLeastOnce,
        true,
    ));
    if let Some((user, password)) = broker.credentials {
        options.set_credentials(user, password);
    }

    let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

    info!("MQTT trying to connect to {}", settings.mqtt.url);

    let event_loop = {
        let client = client.clone();
        let topics = topics.clone();

        task::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(rumqttc::Event::Outgoing(Outgoing::Disconnect)) => break,
                    Ok(event) => {
                        let result = handle_mqtt_event(event, &client, &topics, &control_tx);

                        if let Err(e) = result {
                            warn!("Error while handling MQTT event: {:?}", e);
                        }
                    }
                    Err(e) => {
                        warn!("MQTT error: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        })
    };

    Ok(MqttClient {
        client,
        topics,
        event_loop: Arc::new(Mutex::new(Some(event_loop))),
    })
}

fn handle_mqtt_event(
    event: rumqttc::Event,
    client: &AsyncClient,
    topics: &Topics,
    control_tx: &UnboundedSender<ControlMessage>,
) -> Result<()> {
    match event {
        rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_)) => {
            info!("MQTT connected");

            // Subscriptions don't survive a reconnect with a clean session
            client.try_subscribe(topics.set_wildcard(), QoS::AtMostOnce)?;
            client.try_publish(topics.bridge_online(), QoS::AtLeastOnce, true, "true")?;
        }
        rumqttc::Event::Incoming(rumqttc::Packet::Publish(msg)) => {
            match control_message(topics, &msg.topic, &msg.payload) {
                Some(message) => control_tx.send(message)?,
                None => debug!("Ignoring message on {}", msg.topic),
            }
        }
        _ => {}
    }

    Ok(())
}

pub fn control_message(topics: &Topics, topic: &str, payload: &[u8]) -> Option<ControlMessage> {
    let id = topics.parse_set(topic)?;

    Some(ControlMessage {
        id,
        payload: ControlPayload::from_slice(payload),
    })
}

impl MqttClient {
    /// Marks the bridge offline and waits for the disconnect to go out.
    pub async fn shutdown(&self) {
        let result = async {
            self.client
                .publish(self.topics.bridge_online(), QoS::AtLeastOnce, true, "false")
                .await?;
            self.client.disconnect().await
        }
        .await;

        if let Err(e) = result {
            warn!("Failed to disconnect from MQTT broker: {}", e);
            return;
        }

        if let Some(event_loop) = self.event_loop.lock().await.take() {
            if tokio::time::timeout(Duration::from_secs(2), event_loop)
                .await
                .is_err()
            {
                warn!("Timed out waiting for MQTT disconnect");
            }
        }
    }
}

impl StatusPublisher for MqttClient {
    fn publish(&self, topic: String, payload: Vec<u8>, retain: bool) {
        if let Err(e) = self.client.try_publish(topic, QoS::AtMostOnce, retain, payload) {
            warn!("Dropping MQTT publish: {}", e);
        }
    }
}
