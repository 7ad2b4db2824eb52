//! NSQ client: one producer, many topic/channel consumers
//! NSQ客户端：一个生产者，多个主题/通道消费者

use super::{NsqError, NsqResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_nsq::{
    NSQChannel, NSQConsumerConfig, NSQConsumerConfigSources, NSQConsumerLookupConfig, NSQEvent,
    NSQProducer, NSQProducerConfig, NSQRequeueDelay, NSQTopic,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Message delivered to a handler / 交给处理器的消息
#[derive(Debug, Clone, PartialEq)]
pub struct NsqMessage {
    pub topic: String,
    pub channel: String,
    pub body: Vec<u8>,
}

/// Message handler; `Ok` finishes the message, `Err` requeues it
/// 消息处理器；`Ok`确认消息，`Err`重新入队
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &NsqMessage) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> MessageHandler for F
where
    F: Fn(&NsqMessage) -> anyhow::Result<()> + Send + Sync,
{
    async fn handle(&self, message: &NsqMessage) -> anyhow::Result<()> {
        self(message)
    }
}

type SharedHandler = Arc<RwLock<Arc<dyn MessageHandler>>>;

/// Client tuning / 客户端参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NsqClientOptions {
    /// Messages a consumer may hold unacknowledged / 消费者可持有的未确认消息数
    pub max_in_flight: u32,
    /// Wait for nsqd to connect and acknowledge, in seconds / 等待nsqd连接与确认的秒数
    pub publish_timeout: u64,
}

impl Default for NsqClientOptions {
    fn default() -> Self {
        Self {
            max_in_flight: 1,
            publish_timeout: 5,
        }
    }
}

struct Producer {
    nsqd_addr: String,
    inner: NSQProducer,
    healthy: bool,
    generation: u64,
}

impl Producer {
    fn connect(nsqd_addr: &str) -> Self {
        Self {
            nsqd_addr: nsqd_addr.to_string(),
            inner: NSQProducerConfig::new(nsqd_addr).build(),
            healthy: false,
            generation: 0,
        }
    }

    /// Drop the connection together with any acks still queued on it
    /// 丢弃连接及其上尚未读取的确认
    fn reconnect(&mut self) {
        self.inner = NSQProducerConfig::new(self.nsqd_addr.as_str()).build();
        self.healthy = false;
        self.generation += 1;
    }
}

struct Subscription {
    handler: SharedHandler,
    task: JoinHandle<()>,
}

/// NSQ client / NSQ客户端
pub struct NsqClient {
    id: i64,
    lookupd_http_addr: String,
    options: NsqClientOptions,
    producer: Mutex<Producer>,
    topics: RwLock<BTreeSet<String>>,
    subscriptions: RwLock<HashMap<String, Subscription>>,
    shutdown: CancellationToken,
}

fn subscription_key(topic: &str, channel: &str) -> String {
    format!("{}/{}", topic, channel)
}

fn lookupd_url(addr: &str) -> String {
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}

impl NsqClient {
    /// Create a client publishing to `nsqd_addr` and discovering producers via lookupd
    /// 创建客户端：向`nsqd_addr`发布，通过lookupd发现生产者
    pub fn new(id: i64, nsqd_addr: &str, lookupd_http_addr: &str) -> Self {
        Self::with_options(id, nsqd_addr, lookupd_http_addr, NsqClientOptions::default())
    }

    pub fn with_options(
        id: i64,
        nsqd_addr: &str,
        lookupd_http_addr: &str,
        options: NsqClientOptions,
    ) -> Self {
        Self {
            id,
            lookupd_http_addr: lookupd_url(lookupd_http_addr),
            options,
            producer: Mutex::new(Producer::connect(nsqd_addr)),
            topics: RwLock::new(BTreeSet::new()),
            subscriptions: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    #[cfg(test)]
    async fn producer_generation(&self) -> u64 {
        self.producer.lock().await.generation
    }

    /// Publish `message` on `topic` and wait for nsqd to acknowledge
    /// 在`topic`上发布消息并等待nsqd确认
    pub async fn publish(&self, topic: &str, message: impl AsRef<[u8]>) -> NsqResult<()> {
        let message = message.as_ref();
        if topic.is_empty() || message.is_empty() {
            return Err(NsqError::EmptyTopicOrMessage);
        }
        let nsq_topic = NSQTopic::new(topic).ok_or_else(|| NsqError::InvalidName(topic.to_string()))?;

        let timeout = Duration::from_secs(self.options.publish_timeout);
        let mut guard = self.producer.lock().await;
        let producer: &mut Producer = &mut guard;
        let acknowledged = tokio::time::timeout(timeout, async {
            while !producer.healthy {
                match producer.inner.consume().await {
                    Some(NSQEvent::Healthy()) => producer.healthy = true,
                    Some(_) => {}
                    None => return Err(NsqError::Closed),
                }
            }

            if let Err(e) = producer.inner.publish(&nsq_topic, message.to_vec()).await {
                return Err(NsqError::Publish(e.to_string()));
            }

            loop {
                match producer.inner.consume().await {
                    Some(NSQEvent::Ok()) => return Ok(()),
                    Some(NSQEvent::Unhealthy()) => {
                        producer.healthy = false;
                        return Err(NsqError::Unhealthy);
                    }
                    Some(_) => {}
                    None => return Err(NsqError::Closed),
                }
            }
        })
        .await;

        let acknowledged = acknowledged.unwrap_or(Err(NsqError::Timeout));
        if let Err(e) = &acknowledged {
            if matches!(e, NsqError::Timeout | NsqError::Closed) {
                // A late ack must not be read by the next publish
                producer.reconnect();
                warn!(
                    "Client {} publish on {} failed ({}), producer reconnected",
                    self.id, topic, e
                );
            }
        }
        drop(guard);
        acknowledged?;

        self.topics.write().insert(topic.to_string());
        debug!("Client {} published {} bytes on {}", self.id, message.len(), topic);
        Ok(())
    }

    /// Subscribe to `topic/channel`; an existing subscription just swaps its handler
    /// 订阅`topic/channel`；已订阅时仅替换处理器
    pub fn subscribe<H>(&self, topic: &str, channel: &str, handler: H) -> NsqResult<()>
    where
        H: MessageHandler + 'static,
    {
        let key = subscription_key(topic, channel);
        let handler: Arc<dyn MessageHandler> = Arc::new(handler);

        let mut subscriptions = self.subscriptions.write();
        if let Some(existing) = subscriptions.get(&key) {
            *existing.handler.write() = handler;
            return Ok(());
        }

        let nsq_topic = NSQTopic::new(topic).ok_or_else(|| NsqError::InvalidName(topic.to_string()))?;
        let nsq_channel =
            NSQChannel::new(channel).ok_or_else(|| NsqError::InvalidName(channel.to_string()))?;

        let mut addresses = HashSet::new();
        addresses.insert(self.lookupd_http_addr.clone());
        let consumer = NSQConsumerConfig::new(nsq_topic, nsq_channel)
            .set_max_in_flight(self.options.max_in_flight)
            .set_sources(NSQConsumerConfigSources::Lookup(
                NSQConsumerLookupConfig::new().set_addresses(addresses),
            ))
            .build();

        let shared: SharedHandler = Arc::new(RwLock::new(handler));
        let task = spawn_consumer(
            consumer,
            topic.to_string(),
            channel.to_string(),
            shared.clone(),
            self.shutdown.child_token(),
        );
        subscriptions.insert(key.clone(), Subscription { handler: shared, task });
        info!("Client {} subscribed to {}", self.id, key);
        Ok(())
    }

    /// Replace the handler of an existing subscription / 替换已有订阅的处理器
    pub fn set_handler<H>(&self, topic: &str, channel: &str, handler: H) -> NsqResult<()>
    where
        H: MessageHandler + 'static,
    {
        let key = subscription_key(topic, channel);
        let subscriptions = self.subscriptions.read();
        let subscription = subscriptions.get(&key).ok_or(NsqError::NotSubscribed(key))?;
        *subscription.handler.write() = Arc::new(handler);
        Ok(())
    }

    /// Topics this client has published to / 本客户端发布过的主题
    pub fn topics(&self) -> Vec<String> {
        self.topics.read().iter().cloned().collect()
    }

    /// Active `topic/channel` keys, sorted / 已订阅的`topic/channel`键（排序）
    pub fn subscriptions(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.subscriptions.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Stop all consumer loops / 停止所有消费循环
    pub async fn close(&self) {
        self.shutdown.cancel();
        let tasks: Vec<JoinHandle<()>> = self
            .subscriptions
            .write()
            .drain()
            .map(|(_, subscription)| subscription.task)
            .collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Consumer task ended abnormally: {}", e);
            }
        }
        info!("Client {} closed", self.id);
    }
}

fn spawn_consumer(
    mut consumer: tokio_nsq::NSQConsumer,
    topic: String,
    channel: String,
    handler: SharedHandler,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                _ = token.cancelled() => break,
                received = consumer.consume_filtered() => received,
            };
            let Some(mut received) = received else {
                break;
            };

            let message = NsqMessage {
                topic: topic.clone(),
                channel: channel.clone(),
                body: std::mem::take(&mut received.body),
            };
            let current = handler.read().clone();
            match current.handle(&message).await {
                Ok(()) => received.finish().await,
                Err(e) => {
                    warn!("Handler for {}/{} failed, requeueing: {}", topic, channel, e);
                    received.requeue(NSQRequeueDelay::DefaultDelay).await;
                }
            }
        }
        debug!("Consumer {}/{} stopped", topic, channel);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_publish_requires_topic_and_message() {
        // Test argument checks / 测试参数检查
        let client = NsqClient::new(1, "127.0.0.1:4150", "127.0.0.1:4161");
        assert!(matches!(
            client.publish("", "hello").await,
            Err(NsqError::EmptyTopicOrMessage)
        ));
        assert!(matches!(
            client.publish("greetings", "").await,
            Err(NsqError::EmptyTopicOrMessage)
        ));
        assert!(matches!(
            client.publish("bad topic!", "hello").await,
            Err(NsqError::InvalidName(_))
        ));
        assert!(client.topics().is_empty());
    }

    #[tokio::test]
    async fn test_publish_timeout_replaces_producer() {
        // Test unacknowledged publish drops the connection / 测试未确认的发布会丢弃连接
        let client = NsqClient::with_options(
            3,
            "127.0.0.1:1",
            "127.0.0.1:4161",
            NsqClientOptions {
                publish_timeout: 1,
                ..NsqClientOptions::default()
            },
        );
        assert_eq!(client.producer_generation().await, 0);

        let err = client.publish("orders", "first").await.unwrap_err();
        assert!(matches!(err, NsqError::Timeout | NsqError::Closed), "{:?}", err);
        assert_eq!(client.producer_generation().await, 1);

        let err = client.publish("orders", "second").await.unwrap_err();
        assert!(matches!(err, NsqError::Timeout | NsqError::Closed), "{:?}", err);
        assert_eq!(client.producer_generation().await, 2);
        assert!(client.topics().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_and_set_handler() {
        // Test subscription bookkeeping / 测试订阅记录
        let client = NsqClient::new(2, "127.0.0.1:4150", "127.0.0.1:4161");

        let err = client
            .set_handler("c1-c2", "channel_2", |_: &NsqMessage| -> anyhow::Result<()> { Ok(()) })
            .unwrap_err();
        assert!(matches!(err, NsqError::NotSubscribed(ref key) if key == "c1-c2/channel_2"));

        client
            .subscribe("c1-c2", "channel_2", |_: &NsqMessage| -> anyhow::Result<()> { Ok(()) })
            .unwrap();
        client
            .subscribe("c1-c2", "channel_2", |_: &NsqMessage| -> anyhow::Result<()> { anyhow::bail!("replaced") })
            .unwrap();
        client
            .subscribe("c2-c1", "channel_1", |_: &NsqMessage| -> anyhow::Result<()> { Ok(()) })
            .unwrap();
        client
            .set_handler("c2-c1", "channel_1", |_: &NsqMessage| -> anyhow::Result<()> { Ok(()) })
            .unwrap();
        assert_eq!(client.subscriptions(), vec!["c1-c2/channel_2", "c2-c1/channel_1"]);

        assert!(matches!(
            client.subscribe("ok", "bad channel!", |_: &NsqMessage| -> anyhow::Result<()> { Ok(()) }),
            Err(NsqError::InvalidName(_))
        ));

        tokio::time::timeout(Duration::from_secs(5), client.close())
            .await
            .unwrap();
        assert!(client.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_closure_handler() {
        // Test blanket handler impl / 测试闭包处理器
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = move |m: &NsqMessage| -> anyhow::Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(!m.body.is_empty(), "empty body");
            Ok(())
        };
        let message = NsqMessage {
            topic: "t".into(),
            channel: "c".into(),
            body: b"payload".to_vec(),
        };
        assert!(handler.handle(&message).await.is_ok());
        let empty = NsqMessage {
            body: Vec::new(),
            ..message
        };
        assert!(handler.handle(&empty).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_lookupd_url() {
        assert_eq!(lookupd_url("127.0.0.1:4161"), "http://127.0.0.1:4161");
        assert_eq!(lookupd_url("https://lookupd:4161"), "https://lookupd:4161");
    }
}
