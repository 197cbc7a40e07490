//! A minimal ROS 2-flavoured node scaffold on top of Zenoh.
//!
//! The scaffold exposes the five primitives a middleware-hosted component
//! needs: typed publish, typed subscribe with callback, typed
//! request/response services, recurring timers, and a per-node parameter
//! store with a validation hook and change notification. Transport,
//! discovery, and session lifetime are Zenoh's business.

pub mod context;
pub mod entity;
pub mod msg;
pub mod msgs;
pub mod node;
pub mod parameter;
pub mod pubsub;
pub mod qos;
pub mod queue;
pub mod service;
pub mod timer;

pub use zenoh::Result;

pub trait Builder {
    type Output;
    fn build(self) -> Result<Self::Output>;
}
