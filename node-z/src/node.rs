use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use zenoh::liveliness::LivelinessToken;
use zenoh::{Result, Session, Wait};

use crate::Builder;
use crate::context::IdCounter;
use crate::entity::{EndpointEntity, EntityKind, NodeEntity};
use crate::msg::{Message, Service};
use crate::parameter::host::ParamHost;
use crate::parameter::service::ParamServices;
use crate::parameter::types::{ParamDescriptor, ParamValue, Parameter, SetParamsResult};
use crate::parameter::wire::ParamEventMsg;
use crate::pubsub::{PubBuilder, SubBuilder};
use crate::qos::QosProfile;
use crate::service::{ClientBuilder, ServerBuilder};
use crate::timer::Timer;

/// A named participant that owns publishers, subscribers, service servers,
/// service clients, timers, and a parameter store.
///
/// Create a node via [`Context::create_node`](crate::context::Context::create_node):
///
/// ```rust,ignore
/// let ctx = ContextBuilder::default().build()?;
/// let node = ctx.create_node("my_node").build()?;
/// ```
pub struct Node {
    pub entity: NodeEntity,
    pub session: Arc<Session>,
    counter: Arc<IdCounter>,
    _lv_token: LivelinessToken,
    params: Arc<ParamHost>,
    _param_services: Option<ParamServices>,
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

pub struct NodeBuilder {
    pub domain_id: usize,
    pub name: String,
    pub namespace: String,
    pub session: Arc<Session>,
    pub counter: Arc<IdCounter>,
    pub(crate) enable_param_services: bool,
    pub(crate) parameter_overrides: HashMap<String, ParamValue>,
}

impl NodeBuilder {
    pub fn with_namespace<S: AsRef<str>>(mut self, namespace: S) -> Self {
        // "/" (root namespace) is normalized to "" for consistent lookups
        let ns = namespace.as_ref();
        self.namespace = if ns == "/" {
            String::new()
        } else {
            ns.to_owned()
        };
        self
    }

    /// Set initial parameter overrides for this node.
    ///
    /// When a parameter is declared, an override for its name replaces the
    /// declared default.
    pub fn with_parameter_overrides(mut self, overrides: HashMap<String, ParamValue>) -> Self {
        self.parameter_overrides = overrides;
        self
    }

    /// Do not register the remote parameter endpoints for this node.
    pub fn without_parameter_services(mut self) -> Self {
        self.enable_param_services = false;
        self
    }
}

impl Builder for NodeBuilder {
    type Output = Node;

    fn build(self) -> Result<Node> {
        let id = self.counter.increment();
        debug!(
            "[NOD] Creating node: {}/{}, id={}",
            self.namespace, self.name, id
        );

        let entity = NodeEntity::new(
            self.domain_id,
            self.session.zid(),
            id,
            self.name.clone(),
            self.namespace.clone(),
        );

        let lv_ke = entity.lv_token_key_expr()?;
        let lv_token = self.session.liveliness().declare_token(lv_ke).wait()?;

        let params = Arc::new(ParamHost::new(entity.fqn(), self.parameter_overrides));

        // All nodes share the absolute parameter event topic.
        let event_pub = PubBuilder::<ParamEventMsg> {
            entity: EndpointEntity {
                id: self.counter.increment(),
                node: entity.clone(),
                kind: EntityKind::Publisher,
                topic: "/parameter_events".to_string(),
                type_name: Some("rcl_interfaces/msg/ParameterEvent".to_string()),
                qos: QosProfile::keep_last(1000),
            },
            session: self.session.clone(),
            with_attachment: true,
            _phantom_data: Default::default(),
        }
        .build()?;
        params.attach_event_pub(event_pub);

        let param_services = if self.enable_param_services {
            Some(ParamServices::new(
                self.session.clone(),
                &entity,
                &self.counter,
                params.clone(),
            )?)
        } else {
            None
        };

        debug!("[NOD] Node ready: {}", entity.fqn());

        Ok(Node {
            entity,
            session: self.session,
            counter: self.counter,
            _lv_token: lv_token,
            params,
            _param_services: param_services,
        })
    }
}

impl Node {
    fn endpoint(&self, topic: &str, kind: EntityKind) -> EndpointEntity {
        EndpointEntity {
            id: self.counter.increment(),
            node: self.entity.clone(),
            kind,
            topic: topic.to_string(),
            ..Default::default()
        }
    }

    /// Create a publisher for the given topic.
    ///
    /// Topic names qualify relative to this node: absolute names (`/...`)
    /// are used as-is, private names (`~...`) expand under the node, and
    /// relative names expand under the namespace.
    pub fn create_pub<T: Message>(&self, topic: &str) -> PubBuilder<T> {
        debug!("[NOD] Creating publisher: topic={}", topic);
        PubBuilder {
            entity: self.endpoint(topic, EntityKind::Publisher),
            session: self.session.clone(),
            with_attachment: true,
            _phantom_data: Default::default(),
        }
    }

    /// Create a subscriber for the given topic.
    pub fn create_sub<T: Message>(&self, topic: &str) -> SubBuilder<T> {
        debug!("[NOD] Creating subscriber: topic={}", topic);
        SubBuilder {
            entity: self.endpoint(topic, EntityKind::Subscription),
            session: self.session.clone(),
            _phantom_data: Default::default(),
        }
    }

    /// Create a service server for the given service name.
    pub fn create_service<T: Service>(&self, name: &str) -> ServerBuilder<T> {
        debug!("[NOD] Creating service: name={}", name);
        ServerBuilder {
            entity: self.endpoint(name, EntityKind::Service),
            session: self.session.clone(),
            _phantom_data: Default::default(),
        }
    }

    /// Create a service client for the given service name.
    pub fn create_client<T: Service>(&self, name: &str) -> ClientBuilder<T> {
        debug!("[NOD] Creating client: name={}", name);
        ClientBuilder {
            entity: self.endpoint(name, EntityKind::Client),
            session: self.session.clone(),
            _phantom_data: Default::default(),
        }
    }

    /// Create a recurring timer owned by this node.
    pub fn create_timer<F>(&self, period: Duration, callback: F) -> Result<Timer>
    where
        F: FnMut() + Send + 'static,
    {
        debug!("[NOD] Creating timer: period={:?}", period);
        Timer::spawn(&self.entity.name, period, callback)
    }

    // ── Parameter API ────────────────────────────────────────────────────────

    /// Declare a parameter with a default value and descriptor.
    ///
    /// Returns the actual initial value, which differs from `default` when
    /// an override was supplied at node construction.
    pub fn declare_parameter(
        &self,
        name: &str,
        default: ParamValue,
        descriptor: ParamDescriptor,
    ) -> std::result::Result<ParamValue, String> {
        self.params.declare(name, default, descriptor)
    }

    /// Get the current value of a declared parameter.
    pub fn get_parameter(&self, name: &str) -> Option<ParamValue> {
        self.params.get(name)
    }

    /// Set the value of a declared parameter.
    ///
    /// The change runs through the store's checks and the registered
    /// validation hook before it is committed.
    pub fn set_parameter(&self, param: Parameter) -> SetParamsResult {
        self.params.set_one(param)
    }

    /// Set a batch of parameters; valid entries commit even when others fail.
    pub fn set_parameters(&self, params: &[Parameter]) -> Vec<SetParamsResult> {
        self.params.set_parameters(params, false)
    }

    /// Set a batch of parameters all-or-nothing. Returns the combined result.
    pub fn set_parameters_atomically(&self, params: &[Parameter]) -> SetParamsResult {
        let results = self.params.set_parameters(params, true);
        match results.iter().find(|r| !r.successful) {
            Some(failure) => failure.clone(),
            None => SetParamsResult::success(),
        }
    }

    /// Register the batch validation hook consulted before any change is
    /// committed. Returning a failure rejects the entire batch.
    pub fn on_set_parameters<F>(&self, hook: F)
    where
        F: Fn(&[Parameter]) -> SetParamsResult + Send + Sync + 'static,
    {
        self.params.on_set_parameters(hook);
    }

    /// Register a listener invoked after each committed change to `name`.
    pub fn on_parameter_update<F>(&self, name: &str, listener: F)
    where
        F: Fn(&Parameter) + Send + Sync + 'static,
    {
        self.params.on_update(name, listener);
    }

    /// The parameter authority backing this node. Handy for callbacks that
    /// outlive a borrow of the node itself.
    pub fn params(&self) -> &Arc<ParamHost> {
        &self.params
    }

    /// Fully-qualified node name.
    pub fn fqn(&self) -> String {
        self.entity.fqn()
    }
}
