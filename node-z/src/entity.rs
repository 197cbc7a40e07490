use std::fmt::Display;
use std::ops::Deref;

use sha2::Digest;
use zenoh::{Result, key_expr::KeyExpr, session::ZenohId};

use crate::qos::QosProfile;

const EMPTY_NAMESPACE: &str = "%";
const EMPTY_TOPIC_TYPE: &str = "EMPTY_TOPIC_TYPE";
pub const ADMIN_SPACE: &str = "@nodez_lv";

/// A 16-byte globally unique endpoint id.
pub type Gid = [u8; 16];

/// Liveliness token key expression announcing a node or endpoint.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct LivelinessKE(pub KeyExpr<'static>);

impl Deref for LivelinessKE {
    type Target = KeyExpr<'static>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Key expression a publisher puts on and a subscriber listens on.
pub struct TopicKE(KeyExpr<'static>);

impl Deref for TopicKE {
    type Target = KeyExpr<'static>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Default, Debug, Hash, Clone, PartialEq, Eq)]
pub struct NodeEntity {
    pub domain_id: usize,
    pub z_id: ZenohId,
    pub id: usize,
    pub name: String,
    pub namespace: String,
}

impl NodeEntity {
    pub fn new(domain_id: usize, z_id: ZenohId, id: usize, name: String, namespace: String) -> Self {
        Self {
            domain_id,
            z_id,
            id,
            name,
            namespace,
        }
    }

    /// Fully-qualified node name, e.g. `/ns/my_node` or `/my_node`.
    pub fn fqn(&self) -> String {
        if self.namespace.is_empty() || self.namespace == "/" {
            format!("/{}", self.name)
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    pub fn lv_token_key_expr(&self) -> Result<KeyExpr<'static>> {
        let ke: LivelinessKE = self.try_into()?;
        Ok(ke.0)
    }
}

impl TryFrom<&NodeEntity> for LivelinessKE {
    type Error = zenoh::Error;

    // <ADMIN_SPACE>/<domain_id>/<zid>/<nid>/<eid>/<entity_kind>/<namespace>/<node_name>
    fn try_from(value: &NodeEntity) -> std::result::Result<Self, Self::Error> {
        let NodeEntity {
            domain_id,
            z_id,
            id,
            name,
            namespace,
        } = value;
        let namespace = if namespace.is_empty() {
            EMPTY_NAMESPACE
        } else {
            &mangle_name(namespace)
        };
        let entity_kind = EntityKind::Node;
        Ok(LivelinessKE(
            format!("{ADMIN_SPACE}/{domain_id}/{z_id}/{id}/{id}/{entity_kind}/{namespace}/{name}")
                .try_into()?,
        ))
    }
}

#[derive(Default, Debug, Hash, strum::EnumString, strum::Display, Eq, PartialEq, Clone, Copy)]
pub enum EntityKind {
    #[default]
    #[strum(serialize = "NN")]
    Node,
    #[strum(serialize = "MP")]
    Publisher,
    #[strum(serialize = "MS")]
    Subscription,
    #[strum(serialize = "SS")]
    Service,
    #[strum(serialize = "SC")]
    Client,
}

#[derive(Default, Debug, Hash, PartialEq, Eq, Clone)]
pub struct EndpointEntity {
    pub id: usize,
    pub node: NodeEntity,
    pub kind: EntityKind,
    pub topic: String,
    pub type_name: Option<String>,
    pub qos: QosProfile,
}

fn mangle_name(name: &str) -> String {
    name.replace("/", "%")
}

impl TryFrom<&EndpointEntity> for LivelinessKE {
    type Error = zenoh::Error;

    // <ADMIN_SPACE>/<domain_id>/<zid>/<nid>/<eid>/<entity_kind>/<namespace>/<node_name>/<topic_name>/<topic_type>/<topic_qos>
    fn try_from(value: &EndpointEntity) -> std::result::Result<Self, Self::Error> {
        let EndpointEntity {
            id,
            node:
                NodeEntity {
                    domain_id,
                    z_id,
                    id: node_id,
                    name: node_name,
                    namespace: node_namespace,
                },
            kind,
            topic: topic_name,
            type_name,
            qos,
        } = value;

        let node_namespace = if node_namespace.is_empty() {
            EMPTY_NAMESPACE
        } else {
            &mangle_name(node_namespace)
        };
        let node_name = mangle_name(node_name);
        let topic_name = mangle_name(topic_name);
        let type_name = type_name
            .as_deref()
            .map_or(EMPTY_TOPIC_TYPE.to_string(), mangle_name);
        let qos = qos.encode();

        Ok(LivelinessKE(format!(
            "{ADMIN_SPACE}/{domain_id}/{z_id}/{node_id}/{id}/{kind}/{node_namespace}/{node_name}/{topic_name}/{type_name}/{qos}",
        ).try_into()?))
    }
}

impl Display for EndpointEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ke: LivelinessKE = self.try_into().map_err(|_| std::fmt::Error)?;
        write!(f, "{}", ke.0)
    }
}

impl TryFrom<&EndpointEntity> for TopicKE {
    type Error = zenoh::Error;

    // <domain_id>/<topic_name>
    fn try_from(value: &EndpointEntity) -> std::result::Result<Self, Self::Error> {
        let NodeEntity { domain_id, .. } = value.node;
        let topic = {
            let s = &value.topic;
            let s = s.strip_prefix('/').unwrap_or(s);
            let s = s.strip_suffix('/').unwrap_or(s);
            mangle_name(s)
        };
        Ok(TopicKE(format!("{domain_id}/{topic}").try_into()?))
    }
}

impl EndpointEntity {
    pub fn topic_key_expr(&self) -> Result<KeyExpr<'static>> {
        let ke: TopicKE = self.try_into()?;
        Ok(ke.0)
    }

    pub fn lv_token_key_expr(&self) -> Result<KeyExpr<'static>> {
        let ke: LivelinessKE = self.try_into()?;
        Ok(ke.0)
    }

    pub fn gid(&self) -> Gid {
        let mut gid = Gid::default();
        let hash = sha2::Sha256::digest(self.to_string().as_bytes());
        let len = gid.len();
        gid.copy_from_slice(&hash[..len]);
        gid
    }
}

/// Expand a topic or service name relative to its owning node.
///
/// - absolute names (leading `/`) are kept as-is;
/// - private names (leading `~`) expand to `<namespace>/<node_name>/<rest>`;
/// - relative names expand to `<namespace>/<name>`.
pub fn qualify_name(name: &str, namespace: &str, node_name: &str) -> std::result::Result<String, String> {
    if name.is_empty() {
        return Err("name must not be empty".to_string());
    }
    if let Some(rest) = name.strip_prefix('~') {
        let rest = rest.strip_prefix('/').unwrap_or(rest);
        let prefix = if namespace.is_empty() {
            format!("/{node_name}")
        } else {
            format!("{namespace}/{node_name}")
        };
        return Ok(if rest.is_empty() {
            prefix
        } else {
            format!("{prefix}/{rest}")
        });
    }
    if name.starts_with('/') {
        return Ok(name.to_string());
    }
    Ok(if namespace.is_empty() {
        format!("/{name}")
    } else {
        format!("{namespace}/{name}")
    })
}
