//! The per-node parameter authority.
//!
//! `ParamHost` owns the store and the two callback surfaces around it: the
//! batch validation hook consulted before any change is committed, and the
//! name-scoped update listeners invoked after a commit. Both the local
//! parameter API on [`Node`](crate::node::Node) and the remote endpoints in
//! [`service`](super::service) funnel through here, so validation and
//! notification behave identically for either caller.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::{debug, warn};

use crate::pubsub::Pub;

use super::store::ParamStore;
use super::types::{ParamDescriptor, ParamValue, Parameter, SetParamsResult};
use super::wire::{ParamEventMsg, WireParam};

type SetHook = Arc<dyn Fn(&[Parameter]) -> SetParamsResult + Send + Sync>;
type UpdateListener = Arc<dyn Fn(&Parameter) + Send + Sync>;

pub struct ParamHost {
    store: RwLock<ParamStore>,
    on_set: RwLock<Option<SetHook>>,
    listeners: RwLock<HashMap<String, Vec<UpdateListener>>>,
    event_pub: OnceLock<Pub<ParamEventMsg>>,
    node_fqn: String,
}

impl ParamHost {
    pub fn new(node_fqn: impl Into<String>, overrides: HashMap<String, ParamValue>) -> Self {
        let store = if overrides.is_empty() {
            ParamStore::new()
        } else {
            ParamStore::with_overrides(overrides)
        };
        Self {
            store: RwLock::new(store),
            on_set: RwLock::new(None),
            listeners: RwLock::new(HashMap::new()),
            event_pub: OnceLock::new(),
            node_fqn: node_fqn.into(),
        }
    }

    /// Attach the `parameter_events` publisher. Called once during node build.
    pub(crate) fn attach_event_pub(&self, event_pub: Pub<ParamEventMsg>) {
        let _ = self.event_pub.set(event_pub);
    }

    pub fn node_fqn(&self) -> &str {
        &self.node_fqn
    }

    // ── Declaration and reads ────────────────────────────────────────────────

    pub fn declare(
        &self,
        name: &str,
        default: ParamValue,
        descriptor: ParamDescriptor,
    ) -> Result<ParamValue, String> {
        self.store
            .write()
            .map_err(|_| "parameter store lock poisoned".to_string())?
            .declare(name, default, descriptor)
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.store.read().ok()?.get(name)
    }

    pub fn describe(&self, name: &str) -> Option<ParamDescriptor> {
        self.store.read().ok()?.describe(name)
    }

    pub fn list(&self, prefixes: &[String]) -> Vec<String> {
        self.store
            .read()
            .map(|s| s.list(prefixes))
            .unwrap_or_default()
    }

    // ── Callback registration ────────────────────────────────────────────────

    /// Register the validation hook consulted before any change is committed.
    ///
    /// The hook sees the whole proposed batch; returning a failure rejects
    /// the entire batch. Only one hook can be registered; calling this again
    /// replaces the previous one.
    pub fn on_set_parameters<F>(&self, hook: F)
    where
        F: Fn(&[Parameter]) -> SetParamsResult + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.on_set.write() {
            *slot = Some(Arc::new(hook));
        }
    }

    /// Register a listener invoked after each committed change to `name`.
    pub fn on_update<F>(&self, name: &str, listener: F)
    where
        F: Fn(&Parameter) + Send + Sync + 'static,
    {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners
                .entry(name.to_string())
                .or_default()
                .push(Arc::new(listener));
        }
    }

    // ── Writes ───────────────────────────────────────────────────────────────

    /// Set a single parameter.
    pub fn set_one(&self, param: Parameter) -> SetParamsResult {
        self.set_parameters(std::slice::from_ref(&param), false)
            .into_iter()
            .next()
            .unwrap_or_else(|| SetParamsResult::failure("internal error: empty result"))
    }

    /// Validate and apply a batch of parameters. Returns one result per
    /// parameter. If `atomic` is true, either all are committed or none.
    pub fn set_parameters(&self, params: &[Parameter], atomic: bool) -> Vec<SetParamsResult> {
        let mut results = Vec::with_capacity(params.len());

        // Phase 1: built-in validation
        {
            let store = match self.store.read() {
                Ok(s) => s,
                Err(_) => {
                    return params
                        .iter()
                        .map(|_| SetParamsResult::failure("parameter store lock poisoned"))
                        .collect();
                }
            };
            for param in params {
                match store.validate_set(param) {
                    Ok(()) => results.push(SetParamsResult::success()),
                    Err(reason) => results.push(SetParamsResult::failure(reason)),
                }
            }
        }

        // Phase 2: the validation hook sees the batch only if the built-in
        // checks passed; a hook failure rejects the whole batch.
        let all_passed = results.iter().all(|r| r.successful);
        if all_passed
            && let Ok(hook) = self.on_set.read()
            && let Some(verdict) = hook.as_ref().map(|hook| hook(params))
            && !verdict.successful
        {
            warn!(
                "[PAR] Parameter batch rejected by hook: {}",
                verdict.reason
            );
            return params
                .iter()
                .map(|_| SetParamsResult::failure(verdict.reason.clone()))
                .collect();
        }

        if atomic && !results.iter().all(|r| r.successful) {
            return results;
        }

        // Phase 3: commit
        let mut committed = Vec::new();
        if let Ok(mut store) = self.store.write() {
            for (i, param) in params.iter().enumerate() {
                if results[i].successful && store.set(param).is_some() {
                    debug!("[PAR] Parameter committed: {}", param.name);
                    committed.push(param.clone());
                }
            }
        }

        // Phase 4: post-commit notification, then the event topic
        self.notify(&committed);
        self.publish_event(&committed);

        results
    }

    fn notify(&self, committed: &[Parameter]) {
        let Ok(listeners) = self.listeners.read() else {
            return;
        };
        for param in committed {
            if let Some(scoped) = listeners.get(&param.name) {
                for listener in scoped {
                    listener(param);
                }
            }
        }
    }

    fn publish_event(&self, committed: &[Parameter]) {
        if committed.is_empty() {
            return;
        }
        let Some(event_pub) = self.event_pub.get() else {
            return;
        };
        let event = ParamEventMsg {
            node: self.node_fqn.clone(),
            changed_parameters: committed.iter().map(WireParam::from_parameter).collect(),
        };
        if let Err(e) = event_pub.publish(&event) {
            warn!("[PAR] Failed to publish parameter event: {}", e);
        }
    }
}
