//! Concrete message and service records used by the nodes in this
//! workspace. Counterparts of the standard string message and trigger
//! service of the host ecosystem.

use serde::{Deserialize, Serialize};

use crate::msg::Service;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringMsg {
    pub data: String,
}

impl StringMsg {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }

    pub const TYPE_NAME: &str = "std_msgs/msg/String";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerRequest {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
}

/// Empty-request service that fires an action on the server side.
pub struct Trigger;

impl Service for Trigger {
    type Request = TriggerRequest;
    type Response = TriggerResponse;
}

impl Trigger {
    pub const TYPE_NAME: &str = "std_srvs/srv/Trigger";
}
