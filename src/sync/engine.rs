use std::sync::Arc;

use futures::{future::BoxFuture, FutureExt, Stream};
use log::{debug, error};
use serde::Serialize;
use tokio::{sync::mpsc::UnboundedReceiver, task::JoinHandle};

use super::{
    dispatcher::Dispatcher,
    scheduler::{PollCycle, PollScheduler},
};
use crate::{
    hue::{
        command::light_command,
        rest::{BridgeError, HueBridge},
        status::light_report,
    },
    mqtt::{payload::ControlMessage, topics::Topics},
};

/// Fire-and-forget publishing of bridge state.
pub trait StatusPublisher: Send + Sync + 'static {
    fn publish(&self, topic: String, payload: Vec<u8>, retain: bool);
}

fn log_bridge_error(context: &str, e: &BridgeError) {
    error!("{}: {}", context, e);

    if e.is_transport() {
        return;
    }

    match e {
        BridgeError::Rejected(detail) => debug!("{:#}", detail),
        e => debug!("{:?}", e),
    }
}

/// Reads all lights and publishes their reachability and status.
pub struct StatusPoller<B, P> {
    bridge: Arc<B>,
    publisher: Arc<P>,
    topics: Topics,
    retain_status: bool,
}

impl<B, P> Clone for StatusPoller<B, P> {
    fn clone(&self) -> Self {
        StatusPoller {
            bridge: self.bridge.clone(),
            publisher: self.publisher.clone(),
            topics: self.topics.clone(),
            retain_status: self.retain_status,
        }
    }
}

impl<B: HueBridge, P: StatusPublisher> StatusPoller<B, P> {
    pub async fn poll(&self) {
        // A failed read skips the whole cycle, the next trigger retries
        let lights = match self.bridge.get_lights().await {
            Ok(lights) => lights,
            Err(e) => {
                log_bridge_error("Polling Hue lights failed", &e);
                return;
            }
        };

        for (id, light) in &lights {
            let report = light_report(&light.state);

            self.publish(self.topics.device_online(id), &report.online, false);

            if let Some(status) = &report.status {
                self.publish(self.topics.status(id), status, self.retain_status);
            }
        }
    }

    fn publish<T: Serialize>(&self, topic: String, payload: &T, retain: bool) {
        match serde_json::to_vec(payload) {
            Ok(payload) => {
                debug!("Publishing {} {}", topic, String::from_utf8_lossy(&payload));
                self.publisher.publish(topic, payload, retain);
            }
            Err(e) => error!("Failed to serialize payload for {}: {}", topic, e),
        }
    }
}

impl<B: HueBridge, P: StatusPublisher> PollCycle for StatusPoller<B, P> {
    fn poll_once(&self) -> BoxFuture<'static, ()> {
        let poller = self.clone();
        async move { poller.poll().await }.boxed()
    }
}

/// Ties control messages, bridge writes and status polling together.
pub struct SyncEngine<B, P> {
    bridge: Arc<B>,
    dispatcher: Dispatcher,
    scheduler: PollScheduler<StatusPoller<B, P>>,
}

impl<B: HueBridge, P: StatusPublisher> SyncEngine<B, P> {
    pub fn new(
        bridge: Arc<B>,
        publisher: Arc<P>,
        topics: Topics,
        retain_status: bool,
        dispatcher: Dispatcher,
    ) -> Self {
        let poller = StatusPoller {
            bridge: bridge.clone(),
            publisher,
            topics,
            retain_status,
        };

        SyncEngine {
            bridge,
            scheduler: PollScheduler::new(dispatcher.clone(), poller),
            dispatcher,
        }
    }

    /// Queues the bridge write for a control message. Once the write is done,
    /// successful or not, a debounced poll picks up the resulting state.
    pub fn handle_control(&self, message: ControlMessage) {
        let ControlMessage { id, payload } = message;
        let command = light_command(&payload);

        let bridge = self.bridge.clone();
        let scheduler = self.scheduler.clone();

        self.dispatcher.enqueue(async move {
            match bridge.set_light_state(&id, &command).await {
                Ok(()) => debug!(
                    "{} > {}",
                    id,
                    serde_json::to_string(&command).unwrap_or_default()
                ),
                Err(e) => log_bridge_error(&format!("Setting state of light {} failed", id), &e),
            }

            scheduler.after_write();
        });
    }

    /// Spawns the control message loop and the periodic poll loop.
    pub fn start<S>(self, mut control_rx: UnboundedReceiver<ControlMessage>, ticks: S) -> SyncHandle
    where
        S: Stream<Item = ()> + Send + 'static,
    {
        let periodic = self.scheduler.spawn_periodic(ticks);
        let dispatcher = self.dispatcher.clone();

        let controls = tokio::spawn(async move {
            while let Some(message) = control_rx.recv().await {
                self.handle_control(message);
            }
        });

        SyncHandle {
            tasks: vec![periodic, controls],
            dispatcher,
        }
    }
}

/// Running engine, stops everything on [`SyncHandle::shutdown`].
pub struct SyncHandle {
    tasks: Vec<JoinHandle<()>>,
    dispatcher: Dispatcher,
}

impl SyncHandle {
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }

        self.dispatcher.shutdown();
    }
}
