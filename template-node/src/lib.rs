//! The template node: a timer-driven publisher with an echo relay, a
//! counter-reset service, and validated live parameters. The smallest
//! useful demonstration of the node-z wiring.

pub mod node;

pub use node::{DEFAULT_LOOP_RATE, DEFAULT_MESSAGE, RATE_LOCKED_REASON, TemplateNode};
