use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tracing::{debug, error, trace, warn};
use zenoh::key_expr::KeyExpr;
use zenoh::liveliness::LivelinessToken;
use zenoh::query::Query;
use zenoh::{Result, Session, Wait};

use crate::Builder;
use crate::entity::{EndpointEntity, Gid, qualify_name};
use crate::msg::{Attachment, Message, Service};
use crate::queue::BoundedQueue;

/// Identifies an in-flight request: the caller's sequence number plus GID.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct QueryKey {
    pub sn: i64,
    pub gid: Gid,
}

impl From<Attachment> for QueryKey {
    fn from(value: Attachment) -> Self {
        Self {
            sn: value.sequence_number,
            gid: value.source_gid,
        }
    }
}

pub struct ServerBuilder<T> {
    pub entity: EndpointEntity,
    pub session: Arc<Session>,
    pub(crate) _phantom_data: PhantomData<T>,
}

impl<T> ServerBuilder<T>
where
    T: Service,
{
    fn build_internal(
        mut self,
        handler: impl Fn(Query) + Send + Sync + 'static,
        queue: Option<Arc<BoundedQueue<Query>>>,
    ) -> Result<Server<T>> {
        let qualified_service = qualify_name(
            &self.entity.topic,
            &self.entity.node.namespace,
            &self.entity.node.name,
        )
        .map_err(|e| zenoh::Error::from(format!("Failed to qualify service: {}", e)))?;
        self.entity.topic = qualified_service;

        let key_expr = self.entity.topic_key_expr()?;
        debug!("[SRV] Key expression: {}", key_expr);

        let inner = self
            .session
            .declare_queryable(&key_expr)
            .complete(true)
            .callback(handler)
            .wait()?;

        let lv_ke = self.entity.lv_token_key_expr()?;
        let lv_token = self.session.liveliness().declare_token(lv_ke).wait()?;

        debug!("[SRV] Server ready: service={}", self.entity.topic);

        Ok(Server {
            key_expr,
            entity: self.entity,
            _inner: inner,
            _lv_token: lv_token,
            queue,
            map: HashMap::new(),
            _phantom_data: Default::default(),
        })
    }

    /// Build a server that answers each request through `callback`.
    ///
    /// The request is deserialized, handed to the callback, and the returned
    /// response sent back to the caller. Malformed requests are logged and
    /// dropped without a reply; the caller times out.
    pub fn build_with_callback<F>(self, callback: F) -> Result<Server<T>>
    where
        F: Fn(T::Request) -> T::Response + Send + Sync + 'static,
    {
        let handler = move |query: Query| {
            let Some(payload) = query.payload() else {
                warn!("[SRV] Request without payload: {}", query.key_expr());
                return;
            };
            let request = match T::Request::from_bytes(&payload.to_bytes()) {
                Ok(request) => request,
                Err(e) => {
                    warn!("[SRV] Failed to deserialize request: {}", e);
                    return;
                }
            };
            let response = callback(request);

            let mut reply = query.reply(query.key_expr().clone(), response.to_bytes());
            if let Some(att) = query.attachment().and_then(|a| Attachment::try_from(a).ok()) {
                // Echo the caller's sequence number and GID for correlation.
                reply = reply.attachment(Attachment::new(att.sequence_number, att.source_gid));
            }
            if let Err(e) = reply.wait() {
                warn!("[SRV] Failed to send response: {}", e);
            }
        };
        self.build_internal(handler, None)
    }
}

impl<T> Builder for ServerBuilder<T>
where
    T: Service,
{
    type Output = Server<T>;

    fn build(self) -> Result<Self::Output> {
        let queue = Arc::new(BoundedQueue::new(self.entity.qos.history.depth()));
        let handler = {
            let queue = queue.clone();
            move |query: Query| {
                queue.push(query);
            }
        };
        self.build_internal(handler, Some(queue))
    }
}

pub struct Server<T> {
    key_expr: KeyExpr<'static>,
    pub entity: EndpointEntity,
    _inner: zenoh::query::Queryable<()>,
    _lv_token: LivelinessToken,
    queue: Option<Arc<BoundedQueue<Query>>>,
    map: HashMap<QueryKey, Query>,
    _phantom_data: PhantomData<T>,
}

impl<T> std::fmt::Debug for Server<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("key_expr", &self.key_expr.as_str())
            .finish_non_exhaustive()
    }
}

impl<T> Server<T>
where
    T: Service,
{
    fn queue(&self) -> Result<&Arc<BoundedQueue<Query>>> {
        self.queue
            .as_ref()
            .ok_or_else(|| zenoh::Error::from("Server was built with callback, no queue available"))
    }

    fn accept(&mut self, query: Query) -> Result<(QueryKey, T::Request)> {
        let attachment: Attachment = query
            .attachment()
            .ok_or_else(|| zenoh::Error::from("Request without attachment"))?
            .try_into()?;
        let key: QueryKey = attachment.into();

        if self.map.contains_key(&key) {
            warn!("[SRV] Duplicate request: sn={}", key.sn);
            return Err("Existing query detected".into());
        }

        let payload = query
            .payload()
            .ok_or_else(|| zenoh::Error::from("Request without payload"))?
            .to_bytes();
        let request =
            T::Request::from_bytes(&payload).map_err(|e| zenoh::Error::from(e.to_string()))?;
        self.map.insert(key.clone(), query);

        Ok((key, request))
    }

    /// Block waiting for the next request and deserialize its payload.
    pub fn take_request(&mut self) -> Result<(QueryKey, T::Request)> {
        trace!("[SRV] Waiting for request");
        let query = self.queue()?.recv();
        self.accept(query)
    }

    /// Wait up to `timeout` for the next request.
    pub fn take_request_timeout(&mut self, timeout: Duration) -> Result<(QueryKey, T::Request)> {
        let query = self
            .queue()?
            .recv_timeout(timeout)
            .ok_or_else(|| zenoh::Error::from("Receive timed out"))?;
        self.accept(query)
    }

    /// Send the response to a previously taken request.
    pub fn send_response(&mut self, msg: &T::Response, key: &QueryKey) -> Result<()> {
        match self.map.remove(key) {
            Some(query) => {
                debug!("[SRV] Sending response: sn={}", key.sn);
                query
                    .reply(&self.key_expr, msg.to_bytes())
                    .attachment(Attachment::new(key.sn, key.gid))
                    .wait()
            }
            None => {
                error!("[SRV] No query found for sn={}", key.sn);
                Err("Query map doesn't contain key".into())
            }
        }
    }
}

pub struct ClientBuilder<T> {
    pub entity: EndpointEntity,
    pub session: Arc<Session>,
    pub(crate) _phantom_data: PhantomData<T>,
}

impl<T> Builder for ClientBuilder<T>
where
    T: Service,
{
    type Output = Client<T>;

    fn build(mut self) -> Result<Self::Output> {
        let qualified_service = qualify_name(
            &self.entity.topic,
            &self.entity.node.namespace,
            &self.entity.node.name,
        )
        .map_err(|e| zenoh::Error::from(format!("Failed to qualify service: {}", e)))?;
        self.entity.topic = qualified_service;

        let key_expr = self.entity.topic_key_expr()?;
        debug!("[CLN] Key expression: {}", key_expr);

        let inner = self
            .session
            .declare_querier(key_expr)
            .target(zenoh::query::QueryTarget::AllComplete)
            .consolidation(zenoh::query::ConsolidationMode::None)
            .timeout(Duration::from_secs(10))
            .wait()?;

        let lv_ke = self.entity.lv_token_key_expr()?;
        let lv_token = self.session.liveliness().declare_token(lv_ke).wait()?;

        let (tx, rx) = flume::bounded(self.entity.qos.history.depth().min(1000));
        debug!("[CLN] Client ready: service={}", self.entity.topic);

        Ok(Client {
            sn: AtomicUsize::new(1),
            gid: self.entity.gid(),
            service: self.entity.topic.clone(),
            entity: self.entity,
            inner,
            _lv_token: lv_token,
            tx,
            rx,
            _phantom_data: Default::default(),
        })
    }
}

pub struct Client<T> {
    sn: AtomicUsize,
    gid: Gid,
    service: String,
    pub entity: EndpointEntity,
    inner: zenoh::query::Querier<'static>,
    _lv_token: LivelinessToken,
    tx: flume::Sender<zenoh::sample::Sample>,
    rx: flume::Receiver<zenoh::sample::Sample>,
    _phantom_data: PhantomData<T>,
}

impl<T> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl<T> Client<T>
where
    T: Service,
{
    fn new_attachment(&self) -> Attachment {
        Attachment::new(self.sn.fetch_add(1, Ordering::AcqRel) as _, self.gid)
    }

    /// Dispatch a request. Resolves once the query is sent; it does not wait
    /// for a response. Succeeds even when no server is up.
    pub fn send_request(&self, msg: &T::Request) -> Result<()> {
        debug!("[CLN] Sending request: service={}", self.service);
        let tx = self.tx.clone();
        self.inner
            .get()
            .payload(msg.to_bytes())
            .attachment(self.new_attachment())
            .callback(move |reply| match reply.into_result() {
                Ok(sample) => {
                    // Bounded channel: overflow drops the response (depth QoS).
                    if tx.try_send(sample).is_err() {
                        warn!("[CLN] Response queue full, dropping response");
                    }
                }
                Err(e) => {
                    warn!("[CLN] Reply error: {:?}", e);
                }
            })
            .wait()
    }

    /// Retrieve the next response without blocking.
    pub fn take_response(&self) -> Result<T::Response> {
        match self.rx.try_recv() {
            Ok(sample) => Self::decode(sample),
            Err(flume::TryRecvError::Empty) => Err("No response available".into()),
            Err(flume::TryRecvError::Disconnected) => Err("Channel disconnected".into()),
        }
    }

    /// Wait up to `timeout` for the next response.
    pub fn take_response_timeout(&self, timeout: Duration) -> Result<T::Response> {
        let sample = self.rx.recv_timeout(timeout)?;
        Self::decode(sample)
    }

    /// Synchronous round trip: dispatch the request, wait for its response.
    pub fn call(&self, msg: &T::Request, timeout: Duration) -> Result<T::Response> {
        self.send_request(msg)?;
        self.take_response_timeout(timeout)
    }

    fn decode(sample: zenoh::sample::Sample) -> Result<T::Response> {
        let payload = sample.payload().to_bytes();
        T::Response::from_bytes(&payload).map_err(|e| zenoh::Error::from(e.to_string()))
    }
}
