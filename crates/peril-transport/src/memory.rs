//! In-process broker with AMQP-style exchanges, queues and acknowledgments.
//!
//! Every clone of [`InMemoryBroker`] shares the same topology, so one broker
//! can back a server and any number of clients inside one process.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::{
    AckType, Broker, Delivery, ExchangeKind, Publisher, QueueDurability,
    QueueHandle, Subscription, TransportError,
};

/// Counter for generating unique delivery tags.
static NEXT_DELIVERY_TAG: AtomicU64 = AtomicU64::new(1);

/// Locks a std mutex, recovering the data if a holder panicked. None of the
/// critical sections below can leave the data half-updated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct Message {
    routing_key: String,
    content_type: String,
    body: Vec<u8>,
    /// Times this message has been handed to a consumer.
    delivery_count: u32,
}

#[derive(Debug)]
struct Queue {
    name: String,
    durability: QueueDurability,
    messages: Mutex<VecDeque<Message>>,
    notify: Notify,
    consumers: AtomicUsize,
    closed: AtomicBool,
}

impl Queue {
    fn new(name: &str, durability: QueueDurability) -> Self {
        Self {
            name: name.to_string(),
            durability,
            messages: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            consumers: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    fn push_back(&self, msg: Message) {
        lock(&self.messages).push_back(msg);
        self.notify.notify_one();
    }

    fn pop_front(&self) -> Option<Message> {
        let mut messages = lock(&self.messages);
        let msg = messages.pop_front();
        // Chain the wakeup so a second waiting consumer sees the rest.
        if msg.is_some() && !messages.is_empty() {
            self.notify.notify_one();
        }
        msg
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

#[derive(Debug)]
struct Binding {
    exchange: String,
    queue: String,
    key: String,
}

#[derive(Debug, Default)]
struct Topology {
    closed: bool,
    exchanges: HashMap<String, ExchangeKind>,
    queues: HashMap<String, Arc<Queue>>,
    bindings: Vec<Binding>,
}

impl Topology {
    fn delete_queue(&mut self, queue: &Arc<Queue>) {
        let is_same = self
            .queues
            .get(&queue.name)
            .is_some_and(|q| Arc::ptr_eq(q, queue));
        if is_same {
            self.queues.remove(&queue.name);
            self.bindings.retain(|b| b.queue != queue.name);
        }
        queue.close();
    }
}

/// An in-process message broker.
///
/// Cheap to clone; all clones share one topology.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    topology: Arc<Mutex<Topology>>,
}

impl InMemoryBroker {
    /// Creates an empty broker with no exchanges or queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ready (not yet delivered) messages in a queue.
    pub fn queue_len(&self, queue: &str) -> Option<usize> {
        lock(&self.topology)
            .queues
            .get(queue)
            .map(|q| lock(&q.messages).len())
    }

    /// Returns `true` if the queue currently exists.
    pub fn has_queue(&self, queue: &str) -> bool {
        lock(&self.topology).queues.contains_key(queue)
    }

    /// Shuts the broker down. Subscriptions drain to `None` and further
    /// publishes fail with [`TransportError::Closed`].
    pub fn close(&self) {
        let mut topology = lock(&self.topology);
        topology.closed = true;
        for queue in topology.queues.values() {
            queue.close();
        }
        tracing::info!("in-memory broker closed");
    }
}

impl Publisher for InMemoryBroker {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        content_type: &str,
    ) -> Result<(), TransportError> {
        let targets = {
            let topology = lock(&self.topology);
            if topology.closed {
                return Err(TransportError::Closed);
            }
            let kind = *topology
                .exchanges
                .get(exchange)
                .ok_or_else(|| TransportError::ExchangeNotFound(exchange.to_string()))?;

            let mut targets: Vec<Arc<Queue>> = Vec::new();
            for binding in topology.bindings.iter().filter(|b| {
                b.exchange == exchange && kind.matches(&b.key, routing_key)
            }) {
                // A queue bound twice still gets a single copy.
                if targets.iter().any(|q| q.name == binding.queue) {
                    continue;
                }
                if let Some(queue) = topology.queues.get(&binding.queue) {
                    targets.push(Arc::clone(queue));
                }
            }
            targets
        };

        if targets.is_empty() {
            tracing::trace!(exchange, routing_key, "unroutable message dropped");
        }
        for queue in targets {
            tracing::trace!(exchange, routing_key, queue = %queue.name, "routed");
            queue.push_back(Message {
                routing_key: routing_key.to_string(),
                content_type: content_type.to_string(),
                body: payload.to_vec(),
                delivery_count: 0,
            });
        }
        Ok(())
    }
}

impl Broker for InMemoryBroker {
    type Subscription = MemorySubscription;

    async fn declare_exchange(
        &self,
        name: &str,
        kind: ExchangeKind,
    ) -> Result<(), TransportError> {
        let mut topology = lock(&self.topology);
        if topology.closed {
            return Err(TransportError::Closed);
        }
        match topology.exchanges.get(name) {
            Some(existing) if *existing != kind => {
                Err(TransportError::ExchangeKindMismatch(name.to_string()))
            }
            Some(_) => Ok(()),
            None => {
                topology.exchanges.insert(name.to_string(), kind);
                tracing::debug!(exchange = name, ?kind, "exchange declared");
                Ok(())
            }
        }
    }

    async fn declare_and_bind(
        &self,
        exchange: &str,
        queue: &str,
        key: &str,
        durability: QueueDurability,
    ) -> Result<QueueHandle, TransportError> {
        let mut topology = lock(&self.topology);
        if topology.closed {
            return Err(TransportError::Closed);
        }
        if !topology.exchanges.contains_key(exchange) {
            return Err(TransportError::ExchangeNotFound(exchange.to_string()));
        }

        match topology.queues.get(queue) {
            Some(existing) if existing.durability != durability => {
                return Err(TransportError::QueueMismatch(queue.to_string()));
            }
            Some(_) => {}
            None => {
                topology
                    .queues
                    .insert(queue.to_string(), Arc::new(Queue::new(queue, durability)));
            }
        }

        let already_bound = topology
            .bindings
            .iter()
            .any(|b| b.exchange == exchange && b.queue == queue && b.key == key);
        if !already_bound {
            topology.bindings.push(Binding {
                exchange: exchange.to_string(),
                queue: queue.to_string(),
                key: key.to_string(),
            });
        }
        tracing::debug!(exchange, queue, key, %durability, "queue bound");

        Ok(QueueHandle {
            name: queue.to_string(),
            durability,
        })
    }

    async fn consume(
        &self,
        handle: &QueueHandle,
    ) -> Result<MemorySubscription, TransportError> {
        let topology = lock(&self.topology);
        if topology.closed {
            return Err(TransportError::Closed);
        }
        let queue = topology
            .queues
            .get(&handle.name)
            .ok_or_else(|| TransportError::QueueNotFound(handle.name.clone()))?;

        if queue.durability == QueueDurability::Transient
            && queue.consumers.load(Ordering::SeqCst) > 0
        {
            return Err(TransportError::QueueLocked(handle.name.clone()));
        }
        queue.consumers.fetch_add(1, Ordering::SeqCst);

        Ok(MemorySubscription {
            topology: Arc::clone(&self.topology),
            queue: Arc::clone(queue),
            unacked: HashMap::new(),
        })
    }
}

/// A consumer attached to one queue of an [`InMemoryBroker`].
///
/// Dropping it requeues every unsettled delivery. Dropping the consumer of a
/// transient queue deletes the queue and its bindings.
#[derive(Debug)]
pub struct MemorySubscription {
    topology: Arc<Mutex<Topology>>,
    queue: Arc<Queue>,
    unacked: HashMap<u64, Message>,
}

impl MemorySubscription {
    /// Name of the queue this subscription consumes from.
    pub fn queue_name(&self) -> &str {
        &self.queue.name
    }

    /// Number of deliveries handed out and not yet settled.
    pub fn unsettled(&self) -> usize {
        self.unacked.len()
    }
}

impl Subscription for MemorySubscription {
    async fn next(&mut self) -> Option<Delivery> {
        let queue = Arc::clone(&self.queue);
        loop {
            // Register interest before checking, so a push or close that
            // lands in between still wakes us.
            let notified = queue.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if queue.is_closed() {
                return None;
            }
            if let Some(mut msg) = queue.pop_front() {
                msg.delivery_count += 1;
                let delivery_tag = NEXT_DELIVERY_TAG.fetch_add(1, Ordering::Relaxed);
                let delivery = Delivery {
                    delivery_tag,
                    routing_key: msg.routing_key.clone(),
                    content_type: msg.content_type.clone(),
                    body: msg.body.clone(),
                    redelivered: msg.delivery_count > 1,
                    delivery_count: msg.delivery_count,
                };
                self.unacked.insert(delivery_tag, msg);
                return Some(delivery);
            }

            notified.await;
        }
    }

    fn settle(
        &mut self,
        delivery: &Delivery,
        ack: AckType,
    ) -> Result<(), TransportError> {
        let msg = self
            .unacked
            .remove(&delivery.delivery_tag)
            .ok_or(TransportError::UnknownDeliveryTag(delivery.delivery_tag))?;

        tracing::trace!(
            queue = %self.queue.name,
            tag = delivery.delivery_tag,
            %ack,
            "delivery settled"
        );
        match ack {
            AckType::Ack | AckType::NackDiscard => {}
            AckType::NackRequeue => {
                if !self.queue.is_closed() {
                    self.queue.push_back(msg);
                }
            }
        }
        Ok(())
    }
}

impl Drop for MemorySubscription {
    fn drop(&mut self) {
        self.queue.consumers.fetch_sub(1, Ordering::SeqCst);

        if self.queue.durability == QueueDurability::Transient {
            lock(&self.topology).delete_queue(&self.queue);
            return;
        }

        if self.queue.is_closed() || self.unacked.is_empty() {
            return;
        }
        let mut tags: Vec<u64> = self.unacked.keys().copied().collect();
        tags.sort_unstable();
        {
            let mut messages = lock(&self.queue.messages);
            for tag in tags.into_iter().rev() {
                if let Some(msg) = self.unacked.remove(&tag) {
                    messages.push_front(msg);
                }
            }
        }
        self.queue.notify.notify_one();
        tracing::debug!(queue = %self.queue.name, "requeued unsettled deliveries");
    }
}
