use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tracing::{debug, error, trace};
use zenoh::liveliness::LivelinessToken;
use zenoh::sample::Sample;
use zenoh::{Result, Session, Wait};

use crate::Builder;
use crate::entity::{EndpointEntity, Gid, qualify_name};
use crate::msg::{Attachment, Message};
use crate::qos::{QosDurability, QosProfile, QosReliability};
use crate::queue::BoundedQueue;

pub struct PubBuilder<T> {
    pub entity: EndpointEntity,
    pub session: Arc<Session>,
    pub(crate) with_attachment: bool,
    pub(crate) _phantom_data: PhantomData<T>,
}

impl<T> PubBuilder<T> {
    pub fn with_qos(mut self, qos: QosProfile) -> Self {
        self.entity.qos = qos;
        self
    }

    /// Advertise a type name in the liveliness token for this publisher.
    pub fn with_type_name<S: Into<String>>(mut self, type_name: S) -> Self {
        self.entity.type_name = Some(type_name.into());
        self
    }

    pub fn with_attachment(mut self, with_attachment: bool) -> Self {
        self.with_attachment = with_attachment;
        self
    }
}

impl<T> Builder for PubBuilder<T>
where
    T: Message,
{
    type Output = Pub<T>;

    fn build(mut self) -> Result<Self::Output> {
        let qualified_topic = qualify_name(
            &self.entity.topic,
            &self.entity.node.namespace,
            &self.entity.node.name,
        )
        .map_err(|e| zenoh::Error::from(format!("Failed to qualify topic: {}", e)))?;
        self.entity.topic = qualified_topic;

        let key_expr = self.entity.topic_key_expr()?;
        debug!("[PUB] Key expression: {}", key_expr);

        let mut pub_builder = self.session.declare_publisher(key_expr);

        // Reliable blocks under congestion, BestEffort drops.
        pub_builder = match self.entity.qos.reliability {
            QosReliability::Reliable => {
                pub_builder.congestion_control(zenoh::qos::CongestionControl::Block)
            }
            QosReliability::BestEffort => {
                pub_builder.congestion_control(zenoh::qos::CongestionControl::Drop)
            }
        };
        if self.entity.qos.durability == QosDurability::TransientLocal {
            pub_builder = pub_builder.express(true);
        }

        let inner = pub_builder.wait()?;

        let lv_ke = self.entity.lv_token_key_expr()?;
        let lv_token = self.session.liveliness().declare_token(lv_ke).wait()?;
        let gid = self.entity.gid();

        debug!("[PUB] Publisher ready: topic={}", self.entity.topic);

        Ok(Pub {
            entity: self.entity,
            sn: AtomicUsize::new(0),
            gid,
            inner,
            _lv_token: lv_token,
            with_attachment: self.with_attachment,
            _phantom_data: Default::default(),
        })
    }
}

pub struct Pub<T> {
    pub entity: EndpointEntity,
    sn: AtomicUsize,
    gid: Gid,
    inner: zenoh::pubsub::Publisher<'static>,
    _lv_token: LivelinessToken,
    with_attachment: bool,
    _phantom_data: PhantomData<T>,
}

impl<T> Pub<T>
where
    T: Message,
{
    fn new_attachment(&self) -> Attachment {
        let sn = self.sn.fetch_add(1, Ordering::Relaxed);
        trace!("[PUB] Attachment: sn={}, gid={:02x?}", sn, &self.gid[..4]);
        Attachment::new(sn as _, self.gid)
    }

    /// Serialize and put the message on the topic. Fire-and-forget: errors
    /// surface only from the transport layer.
    pub fn publish(&self, msg: &T) -> Result<()> {
        let payload = msg.to_bytes();
        trace!(
            "[PUB] Publishing: topic={}, len={}",
            self.entity.topic,
            payload.len()
        );
        let mut put_builder = self.inner.put(payload);
        if self.with_attachment {
            put_builder = put_builder.attachment(self.new_attachment());
        }
        put_builder.wait()
    }
}

pub struct SubBuilder<T> {
    pub entity: EndpointEntity,
    pub session: Arc<Session>,
    pub(crate) _phantom_data: PhantomData<T>,
}

impl<T> SubBuilder<T>
where
    T: Message,
{
    pub fn with_qos(mut self, qos: QosProfile) -> Self {
        self.entity.qos = qos;
        self
    }

    pub fn with_type_name<S: Into<String>>(mut self, type_name: S) -> Self {
        self.entity.type_name = Some(type_name.into());
        self
    }

    fn build_internal(
        mut self,
        handler: impl Fn(Sample) + Send + Sync + 'static,
        queue: Option<Arc<BoundedQueue<Sample>>>,
    ) -> Result<Sub<T>> {
        let qualified_topic = qualify_name(
            &self.entity.topic,
            &self.entity.node.namespace,
            &self.entity.node.name,
        )
        .map_err(|e| zenoh::Error::from(format!("Failed to qualify topic: {}", e)))?;
        self.entity.topic = qualified_topic;

        let key_expr = self.entity.topic_key_expr()?;
        debug!(
            "[SUB] Key expression: {}, qos={:?}",
            key_expr, self.entity.qos
        );

        let inner = self
            .session
            .declare_subscriber(key_expr)
            .callback(handler)
            .wait()?;

        let lv_ke = self.entity.lv_token_key_expr()?;
        let lv_token = self.session.liveliness().declare_token(lv_ke).wait()?;

        debug!("[SUB] Subscriber ready: topic={}", self.entity.topic);

        Ok(Sub {
            entity: self.entity,
            queue,
            _inner: inner,
            _lv_token: lv_token,
            _phantom_data: Default::default(),
        })
    }

    /// Build a subscriber that hands each deserialized message to `callback`.
    ///
    /// A sample that fails to deserialize is logged and dropped; the
    /// subscription stays up.
    pub fn build_with_callback<F>(self, callback: F) -> Result<Sub<T>>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let handler = move |sample: Sample| {
            let payload = sample.payload().to_bytes();
            match T::from_bytes(&payload) {
                Ok(msg) => callback(msg),
                Err(e) => error!("[SUB] Failed to deserialize message: {}", e),
            }
        };
        self.build_internal(handler, None)
    }
}

impl<T> Builder for SubBuilder<T>
where
    T: Message,
{
    type Output = Sub<T>;

    fn build(self) -> Result<Self::Output> {
        let queue = Arc::new(BoundedQueue::new(self.entity.qos.history.depth()));
        let handler = {
            let queue = queue.clone();
            move |sample: Sample| {
                if queue.push(sample) {
                    trace!("[SUB] Queue full, dropped oldest sample");
                }
            }
        };
        self.build_internal(handler, Some(queue))
    }
}

pub struct Sub<T> {
    pub entity: EndpointEntity,
    queue: Option<Arc<BoundedQueue<Sample>>>,
    _inner: zenoh::pubsub::Subscriber<()>,
    _lv_token: LivelinessToken,
    _phantom_data: PhantomData<T>,
}

impl<T> Sub<T>
where
    T: Message,
{
    fn queue(&self) -> Result<&Arc<BoundedQueue<Sample>>> {
        self.queue.as_ref().ok_or_else(|| {
            zenoh::Error::from("Subscriber was built with callback, no queue available")
        })
    }

    fn decode(sample: Sample) -> Result<T> {
        let payload = sample.payload().to_bytes();
        T::from_bytes(&payload).map_err(|e| zenoh::Error::from(e.to_string()))
    }

    /// Receive and deserialize the next message, blocking until one arrives.
    pub fn recv(&self) -> Result<T> {
        Self::decode(self.queue()?.recv())
    }

    /// Receive with a deadline.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T> {
        let sample = self
            .queue()?
            .recv_timeout(timeout)
            .ok_or_else(|| zenoh::Error::from("Receive timed out"))?;
        Self::decode(sample)
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Option<Result<T>> {
        let sample = self.queue.as_ref()?.try_recv()?;
        Some(Self::decode(sample))
    }

    /// Check if there are messages waiting in the queue.
    pub fn is_ready(&self) -> bool {
        self.queue.as_ref().map(|q| !q.is_empty()).unwrap_or(false)
    }
}
