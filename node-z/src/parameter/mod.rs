//! Per-node runtime parameters: typed values, declaration with defaults and
//! overrides, a batch validation hook, name-scoped change listeners, and the
//! remote get/set/list endpoints.

pub mod host;
pub mod service;
pub mod store;
pub mod types;
pub mod wire;

pub use host::ParamHost;
pub use service::ParamServices;
pub use types::{ParamDescriptor, ParamType, ParamValue, Parameter, SetParamsResult};
