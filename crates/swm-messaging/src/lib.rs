//! Messaging (C7, spec.md §4.7, §6): publishing testing requests and
//! upload/phase-change announcements onto the team's AMQP broker. A trait
//! plus an in-memory fake, mirroring the tracker/snap-store/git-tag client
//! split (spec.md §6), so message construction is unit-testable without a
//! live broker.

pub mod messages;

use std::sync::Mutex;

use amiquip::{
    Connection, ConsumerMessage, ConsumerOptions, ExchangeDeclareOptions, ExchangeType,
    FieldTable, Publish, QueueDeclareOptions,
};
use serde::Serialize;
use tracing::{debug, instrument};

use swm_utils::error::MessagingError;

pub use messages::{AnnouncementMessage, TestingRequestMessage};

/// The topic exchange every SWM message is published to (spec.md §6:
/// "a topic exchange (AMQP-style) named `kernel`").
pub const EXCHANGE_NAME: &str = "kernel";

/// Routing key for messages with no fixed wire schema (announcements);
/// testing requests build their own key via
/// [`TestingRequestMessage::key_for_proposed`] / `key_for_ppa`.
#[must_use]
pub fn routing_key(kind: &str, series: &str) -> String {
    format!("swm.{kind}.{series}")
}

/// Everything the engine needs to publish a workflow message. Implementors
/// must stamp `delivery_mode = 2` (persistent) on every publish.
pub trait MessageSink: Send + Sync {
    fn publish_json(&self, routing_key: &str, payload: &serde_json::Value)
        -> Result<(), MessagingError>;
}

/// Serialize `payload` and publish it, wrapping JSON-encode failures as
/// `MessagingError::Publish` (these are programmer errors -- every payload
/// type here is a plain serializable struct -- so they should never
/// actually occur, but the trait boundary still returns a `Result`).
pub fn publish<S: Serialize>(
    sink: &dyn MessageSink,
    routing_key: &str,
    payload: &S,
) -> Result<(), MessagingError> {
    let value = serde_json::to_value(payload)
        .map_err(|e| MessagingError::Publish(format!("failed to encode payload: {e}")))?;
    sink.publish_json(routing_key, &value)
}

/// `amiquip`-backed production sink. Holds one channel behind a `Mutex` so
/// a single connection can be shared and published to from several
/// threads (`publish_json` is the thread-safe entry point; the crank loop
/// itself is single-threaded per spec.md §5, but tests and the CLI's
/// one-shot announcement commands share this type).
pub struct AmqpMessageSink {
    connection: Mutex<Connection>,
}

impl AmqpMessageSink {
    /// Connect to the broker and declare the exchange once, up front, so
    /// every later publish is just a `basic_publish`.
    pub fn connect(amqp_url: &str) -> Result<Self, MessagingError> {
        let mut connection = Connection::insecure_open(amqp_url)
            .map_err(|e| MessagingError::Connect(e.to_string()))?;
        {
            let channel = connection
                .open_channel(None)
                .map_err(|e| MessagingError::Connect(e.to_string()))?;
            channel
                .exchange_declare(
                    ExchangeType::Topic,
                    EXCHANGE_NAME,
                    ExchangeDeclareOptions {
                        durable: true,
                        ..ExchangeDeclareOptions::default()
                    },
                )
                .map_err(|e| MessagingError::Connect(e.to_string()))?;
        }
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
}

impl MessageSink for AmqpMessageSink {
    #[instrument(skip(self, payload), fields(routing_key))]
    fn publish_json(
        &self,
        routing_key: &str,
        payload: &serde_json::Value,
    ) -> Result<(), MessagingError> {
        debug!(routing_key, "publishing workflow message");
        let body = serde_json::to_vec(payload)
            .map_err(|e| MessagingError::Publish(format!("failed to encode payload: {e}")))?;
        let connection = self
            .connection
            .lock()
            .map_err(|_| MessagingError::Publish("connection mutex poisoned".to_string()))?;
        let channel = connection
            .open_channel(None)
            .map_err(|e| MessagingError::Publish(e.to_string()))?;
        let exchange = channel
            .exchange_declare(
                ExchangeType::Topic,
                EXCHANGE_NAME,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
            )
            .map_err(|e| MessagingError::Publish(e.to_string()))?;
        exchange
            .publish(Publish::with_properties(
                body,
                routing_key,
                amiquip::AmqpProperties::default()
                    .with_delivery_mode(2)
                    .with_content_type("application/json".to_string()),
            ))
            .map_err(|e| MessagingError::Publish(e.to_string()))
    }
}

impl AmqpMessageSink {
    /// Publish from a thread other than the one that owns this sink (ground:
    /// `msgq.py::publish_threadsafe`'s `add_callback_threadsafe` wrapper).
    /// amiquip has no equivalent of pika's callback queue; the connection
    /// is already behind a `Mutex` here, so serializing through it gives
    /// the same "safe to call from any thread" guarantee `publish_json`
    /// itself already provides.
    pub fn publish_threadsafe(
        &self,
        routing_key: &str,
        payload: &serde_json::Value,
    ) -> Result<(), MessagingError> {
        self.publish_json(routing_key, payload)
    }

    /// Declare `queue_name`, bind it to every key in `routing_keys`, and
    /// invoke `handler` once per decoded JSON payload, acking only after the
    /// handler returns (ground: `msgq.py::listen_worker`). `prefetch_count`
    /// is fixed at 1 per spec.md §4.7; `global_qos` is only requested when
    /// the broker is known to support it, matching
    /// `msgq.py::MsgQueueService.supports_global_qos`.
    ///
    /// Blocks the calling thread until the connection closes or `handler`
    /// returns `Err`. SWM itself never calls this -- every workflow signal
    /// it needs arrives as a tag on the tracking bug, not a queue message
    /// (spec.md §1's non-goals) -- but it completes the C7 interface for
    /// the other consumers (the IRC bot, cert-lab listeners) that share
    /// this exchange.
    pub fn listen_worker<F>(
        &self,
        queue_name: &str,
        routing_keys: &[&str],
        durable: bool,
        auto_delete: bool,
        global_qos: bool,
        mut handler: F,
    ) -> Result<(), MessagingError>
    where
        F: FnMut(serde_json::Value) -> Result<(), MessagingError>,
    {
        let connection = self
            .connection
            .lock()
            .map_err(|_| MessagingError::Connect("connection mutex poisoned".to_string()))?;
        let channel = connection
            .open_channel(None)
            .map_err(|e| MessagingError::Connect(e.to_string()))?;
        channel
            .qos(1, global_qos)
            .map_err(|e| MessagingError::Connect(e.to_string()))?;

        let exchange = channel
            .exchange_declare(
                ExchangeType::Topic,
                EXCHANGE_NAME,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
            )
            .map_err(|e| MessagingError::Connect(e.to_string()))?;

        let queue = channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable,
                    auto_delete,
                    ..QueueDeclareOptions::default()
                },
            )
            .map_err(|e| MessagingError::Connect(e.to_string()))?;
        for key in routing_keys {
            queue
                .bind(&exchange, *key, FieldTable::new())
                .map_err(|e| MessagingError::Connect(e.to_string()))?;
        }

        let consumer = queue
            .consume(ConsumerOptions::default())
            .map_err(|e| MessagingError::Connect(e.to_string()))?;
        for message in consumer.receiver().iter() {
            match message {
                ConsumerMessage::Delivery(delivery) => {
                    let payload: serde_json::Value = serde_json::from_slice(&delivery.body)
                        .map_err(|e| MessagingError::Publish(format!("malformed message body: {e}")))?;
                    handler(payload)?;
                    consumer
                        .ack(delivery)
                        .map_err(|e| MessagingError::Publish(e.to_string()))?;
                }
                ConsumerMessage::ServerClosedChannel(_)
                | ConsumerMessage::ServerClosedConnection(_)
                | ConsumerMessage::ClientCancelled
                | ConsumerMessage::ServerCancelled => break,
            }
        }
        Ok(())
    }
}

/// In-memory sink recording every publish, for handler/engine tests that
/// never touch a real broker.
#[derive(Default)]
pub struct InMemoryMessageSink {
    pub published: Mutex<Vec<(String, serde_json::Value)>>,
}

impl InMemoryMessageSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages_for(&self, routing_key: &str) -> Vec<serde_json::Value> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == routing_key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

impl MessageSink for InMemoryMessageSink {
    fn publish_json(
        &self,
        routing_key: &str,
        payload: &serde_json::Value,
    ) -> Result<(), MessagingError> {
        self.published
            .lock()
            .unwrap()
            .push((routing_key.to_string(), payload.clone()));
        Ok(())
    }
}
