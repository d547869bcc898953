//! Central pub/sub dispatch hub.
//!
//! One unbounded queue takes everything producers emit; a single dispatch
//! task fans each item out to every subscriber whose accepted content-type
//! set matches (or who subscribed to [`ContentType::Any`]). This mirrors the
//! original data hub's worker: a flat list of `(content_types, queue)`
//! registrations and a `None` sentinel that closes every subscriber queue in
//! turn when the hub itself shuts down.

use std::fmt;

use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Sbs1,
    Ogn,
    Nmea,
    Flarm,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentType::Sbs1 => "sbs1",
            ContentType::Ogn => "ogn",
            ContentType::Nmea => "nmea",
            ContentType::Flarm => "flarm",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct HubMessage {
    pub content_type: ContentType,
    pub payload: String,
}

impl HubMessage {
    pub fn new(content_type: ContentType, payload: impl Into<String>) -> Self {
        Self {
            content_type,
            payload: payload.into(),
        }
    }
}

/// What a subscriber accepts. `Any` is the hub's wildcard subscription,
/// used by AirConnect which forwards both NMEA passthrough and generated
/// FLARM traffic without caring which produced a given line.
#[derive(Debug, Clone)]
pub enum Subscription {
    Types(Vec<ContentType>),
    Any,
}

impl Subscription {
    fn accepts(&self, content_type: ContentType) -> bool {
        match self {
            Subscription::Any => true,
            Subscription::Types(types) => types.contains(&content_type),
        }
    }
}

struct Subscriber {
    subscription: Subscription,
    sender: flume::Sender<Option<HubMessage>>,
}

/// The hub's input side: the handle producers hold to submit messages and
/// to signal shutdown.
#[derive(Clone)]
pub struct HubHandle {
    sender: flume::Sender<Option<HubMessage>>,
}

impl HubHandle {
    pub async fn submit(&self, message: HubMessage) {
        // An unbounded send only fails once the dispatch task has dropped
        // its receiver, which happens only after shutdown has already been
        // requested; there's nothing useful to do with that error here.
        let _ = self.sender.send_async(Some(message)).await;
    }

    /// Sends the poison pill. The dispatch task fans a closing `None` out to
    /// every subscriber and then exits.
    pub async fn shutdown(&self) {
        let _ = self.sender.send_async(None).await;
    }
}

pub struct Hub {
    receiver: flume::Receiver<Option<HubMessage>>,
    handle: HubHandle,
    subscribers: Vec<Subscriber>,
}

impl Hub {
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            receiver,
            handle: HubHandle { sender },
            subscribers: Vec::new(),
        }
    }

    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Registers a new subscriber and returns the receiving end of its
    /// dedicated queue. Must be called before [`Hub::run`] starts, since the
    /// subscriber list is fixed for the hub's lifetime.
    pub fn subscribe(&mut self, subscription: Subscription) -> flume::Receiver<Option<HubMessage>> {
        let (sender, receiver) = flume::unbounded();
        self.subscribers.push(Subscriber { subscription, sender });
        receiver
    }

    /// Runs the dispatch loop until a shutdown sentinel is received, then
    /// closes every subscriber queue and returns.
    pub async fn run(self) {
        loop {
            match self.receiver.recv_async().await {
                Ok(Some(message)) => {
                    trace!(content_type = %message.content_type, "dispatching hub message");
                    for subscriber in &self.subscribers {
                        if subscriber.subscription.accepts(message.content_type) {
                            let _ = subscriber.sender.send_async(Some(message.clone())).await;
                        }
                    }
                }
                Ok(None) | Err(_) => {
                    debug!("hub shutting down, closing subscriber queues");
                    for subscriber in &self.subscribers {
                        let _ = subscriber.sender.send_async(None).await;
                    }
                    return;
                }
            }
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(receiver: flume::Receiver<Option<HubMessage>>) -> Vec<HubMessage> {
        let mut items = Vec::new();
        while let Ok(Some(message)) = receiver.recv_async().await {
            items.push(message);
        }
        items
    }

    #[tokio::test]
    async fn subscriber_only_receives_matching_content_types() {
        let mut hub = Hub::new();
        let nmea_only = hub.subscribe(Subscription::Types(vec![ContentType::Nmea]));
        let any = hub.subscribe(Subscription::Any);
        let handle = hub.handle();
        let task = tokio::spawn(hub.run());

        handle.submit(HubMessage::new(ContentType::Sbs1, "sbs-line")).await;
        handle.submit(HubMessage::new(ContentType::Nmea, "nmea-line")).await;
        handle.shutdown().await;

        let (nmea_received, any_received) = tokio::join!(drain(nmea_only), drain(any));

        assert_eq!(nmea_received.len(), 1);
        assert_eq!(any_received.len(), 2);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_closes_every_subscriber_queue() {
        let mut hub = Hub::new();
        let sub = hub.subscribe(Subscription::Any);
        let handle = hub.handle();
        let task = tokio::spawn(hub.run());

        handle.shutdown().await;
        task.await.unwrap();

        assert!(sub.recv_async().await.unwrap().is_none());
    }
}
