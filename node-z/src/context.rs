use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, atomic::AtomicUsize};

use serde_json::json;
use zenoh::{Result, Session, Wait};

use crate::{Builder, node::NodeBuilder, parameter::ParamValue};

/// Process-wide counter handing out entity ids for nodes and endpoints.
#[derive(Debug, Default)]
pub struct IdCounter(AtomicUsize);

impl IdCounter {
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, std::sync::atomic::Ordering::AcqRel)
    }
}

pub struct ContextBuilder {
    domain_id: usize,
    config_file: Option<PathBuf>,
    config_overrides: Vec<(String, serde_json::Value)>,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            domain_id: 0,
            config_file: None,
            config_overrides: Vec::new(),
        }
    }
}

impl ContextBuilder {
    /// Set the domain id used as the first segment of every topic key.
    pub fn with_domain_id(mut self, domain_id: usize) -> Self {
        self.domain_id = domain_id;
        self
    }

    /// Load the Zenoh configuration from a JSON5 file.
    pub fn with_config_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Add a JSON configuration override applied on top of the base config.
    ///
    /// # Example
    /// ```ignore
    /// let ctx = ContextBuilder::default()
    ///     .with_json("scouting/multicast/enabled", json!(false))
    ///     .with_json("connect/endpoints", json!(["tcp/127.0.0.1:7447"]))
    ///     .build()?;
    /// ```
    pub fn with_json<K: Into<String>, V: serde::Serialize>(mut self, key: K, value: V) -> Self {
        let key = key.into();
        let value_json = serde_json::to_value(&value)
            .unwrap_or_else(|_| panic!("Failed to serialize value for key: {}", key));
        self.config_overrides.push((key, value_json));
        self
    }

    /// Convenience method: disable multicast scouting.
    pub fn disable_multicast_scouting(self) -> Self {
        self.with_json("scouting/multicast/enabled", json!(false))
    }

    /// Convenience method: connect to specific endpoints.
    pub fn with_connect_endpoints<I, S>(self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let endpoints: Vec<String> = endpoints.into_iter().map(|s| s.into()).collect();
        self.with_json("connect/endpoints", json!(endpoints))
    }

    /// Convenience method: set mode (peer, client, router).
    pub fn with_mode<S: Into<String>>(self, mode: S) -> Self {
        self.with_json("mode", json!(mode.into()))
    }

    /// Parse and apply overrides from the `NODEZ_CONFIG_OVERRIDE` environment
    /// variable. Expected format: `key1=value1;key2=value2`, values as JSON5.
    fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(overrides_str) = std::env::var("NODEZ_CONFIG_OVERRIDE") {
            tracing::debug!(
                "Applying config overrides from NODEZ_CONFIG_OVERRIDE: {}",
                overrides_str
            );

            for pair in overrides_str.split(';') {
                let pair = pair.trim();
                if pair.is_empty() {
                    continue;
                }

                if let Some((key, value)) = pair.split_once('=') {
                    let key = key.trim();
                    let value = value.trim();

                    match json5::from_str::<serde_json::Value>(value) {
                        Ok(json_value) => {
                            tracing::debug!("Override: {} = {}", key, json_value);
                            self.config_overrides.push((key.to_string(), json_value));
                        }
                        Err(e) => {
                            return Err(format!(
                                "Failed to parse NODEZ_CONFIG_OVERRIDE value for key '{}': {} (value: {})",
                                key, e, value
                            )
                            .into());
                        }
                    }
                } else {
                    return Err(format!(
                        "Invalid NODEZ_CONFIG_OVERRIDE format: '{}'. Expected 'key=value'",
                        pair
                    )
                    .into());
                }
            }
        }

        Ok(self)
    }
}

impl Builder for ContextBuilder {
    type Output = Context;

    fn build(mut self) -> Result<Context> {
        // Priority order:
        // 1. Config file passed via with_config_file()
        // 2. NODEZ_CONFIG_FILE environment variable
        // 3. Default config
        let mut config = if let Some(ref config_file) = self.config_file {
            zenoh::Config::from_file(config_file)?
        } else if let Ok(path) = std::env::var("NODEZ_CONFIG_FILE") {
            zenoh::Config::from_file(path)?
        } else {
            zenoh::Config::default()
        };

        self = self.apply_env_overrides()?;

        for (key, value) in self.config_overrides {
            let value_str = serde_json::to_string(&value)
                .map_err(|e| format!("Failed to serialize value for key '{}': {}", key, e))?;

            config.insert_json5(&key, &value_str).map_err(|e| {
                format!(
                    "Failed to apply config override '{}' = '{}': {}",
                    key, value_str, e
                )
            })?;
        }

        let session = zenoh::open(config).wait()?;
        tracing::debug!("[CTX] Session open: zid={}", session.zid());

        Ok(Context {
            session: Arc::new(session),
            counter: Arc::new(IdCounter::default()),
            domain_id: self.domain_id,
        })
    }
}

pub struct Context {
    session: Arc<Session>,
    // Global counter for the participants
    counter: Arc<IdCounter>,
    domain_id: usize,
}

impl Context {
    pub fn create_node<S: AsRef<str>>(&self, name: S) -> NodeBuilder {
        NodeBuilder {
            domain_id: self.domain_id,
            name: name.as_ref().to_owned(),
            namespace: String::new(),
            session: self.session.clone(),
            counter: self.counter.clone(),
            enable_param_services: true,
            parameter_overrides: HashMap::<String, ParamValue>::new(),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn shutdown(&self) -> Result<()> {
        self.session.close().wait()
    }
}
