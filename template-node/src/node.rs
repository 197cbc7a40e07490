use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{info, warn};

use node_z::msgs::{StringMsg, Trigger, TriggerResponse};
use node_z::node::Node;
use node_z::parameter::{ParamDescriptor, ParamType, ParamValue, Parameter, SetParamsResult};
use node_z::pubsub::Sub;
use node_z::service::Server;
use node_z::timer::Timer;
use node_z::{Builder, Result};

pub const DEFAULT_LOOP_RATE: f64 = 1.0;
pub const DEFAULT_MESSAGE: &str = "Hello World";

/// Fixed rejection reason for any attempt to change the loop rate after
/// construction.
pub const RATE_LOCKED_REASON: &str = "Loop rate cannot be changed dynamically";

/// A node that publishes `"<message> <count>"` on `message` every
/// `1/main_loop_rate` seconds, mirrors `shout` onto `echo`, resets the
/// counter through the `reset_counter` service, and accepts live changes to
/// the `message` parameter (each one also resetting the counter).
///
/// The counter has four writers on three threads (the timer thread, the
/// subscription callback, the service callback, and the parameter-update
/// listener), so it is an atomic.
pub struct TemplateNode {
    node: Node,
    count: Arc<AtomicU64>,
    _sub_shout: Sub<StringMsg>,
    _srv_reset: Server<Trigger>,
    timer: Timer,
}

impl TemplateNode {
    pub fn new(node: Node) -> Result<Self> {
        // Parameters first: the loop rate is read once, here, and never again.
        let rate = node
            .declare_parameter(
                "main_loop_rate",
                ParamValue::Double(DEFAULT_LOOP_RATE),
                ParamDescriptor::new("main_loop_rate", ParamType::Double)
                    .with_description("Main loop frequency in hertz, fixed after construction"),
            )?
            .as_f64()
            .ok_or("main_loop_rate must be a double")?;
        if rate <= 0.0 {
            return Err(format!("main_loop_rate must be positive, got {rate}").into());
        }

        node.declare_parameter(
            "message",
            ParamValue::String(DEFAULT_MESSAGE.to_string()),
            ParamDescriptor::new("message", ParamType::String)
                .with_description("Text published on every tick"),
        )?;

        node.on_set_parameters(guard_loop_rate);

        let count = Arc::new(AtomicU64::new(0));
        {
            let count = count.clone();
            node.on_parameter_update("message", move |_param| {
                count.store(0, Ordering::SeqCst);
            });
        }

        let pub_echo = Arc::new(
            node.create_pub::<StringMsg>("echo")
                .with_type_name(StringMsg::TYPE_NAME)
                .build()?,
        );
        let pub_message = Arc::new(
            node.create_pub::<StringMsg>("message")
                .with_type_name(StringMsg::TYPE_NAME)
                .build()?,
        );

        let sub_shout = {
            let pub_echo = pub_echo.clone();
            node.create_sub::<StringMsg>("shout")
                .with_type_name(StringMsg::TYPE_NAME)
                .build_with_callback(move |msg| {
                    info!("[TPL] Echoing message: {}", msg.data);
                    if let Err(e) = pub_echo.publish(&msg) {
                        warn!("[TPL] Failed to echo: {e}");
                    }
                })?
        };

        let srv_reset = {
            let count = count.clone();
            node.create_service::<Trigger>("reset_counter")
                .build_with_callback(move |_req| {
                    info!("[TPL] Reset counter");
                    count.store(0, Ordering::SeqCst);
                    TriggerResponse {
                        success: true,
                        message: "counter reset".to_string(),
                    }
                })?
        };

        let timer = {
            let count = count.clone();
            let params = node.params().clone();
            node.create_timer(Duration::from_secs_f64(1.0 / rate), move || {
                let message = params
                    .get("message")
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .unwrap_or_default();
                let out = StringMsg::new(render(&message, count.fetch_add(1, Ordering::SeqCst)));
                info!("[TPL] Publishing: {}", out.data);
                if let Err(e) = pub_message.publish(&out) {
                    warn!("[TPL] Failed to publish: {e}");
                }
            })?
        };

        Ok(Self {
            node,
            count,
            _sub_shout: sub_shout,
            _srv_reset: srv_reset,
            timer,
        })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Value the next tick will publish.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    /// The effective tick period, fixed at construction.
    pub fn loop_period(&self) -> Duration {
        self.timer.period()
    }
}

/// Validation hook: a batch touching `main_loop_rate` is rejected whole;
/// everything else passes.
fn guard_loop_rate(params: &[Parameter]) -> SetParamsResult {
    for param in params {
        if param.name == "main_loop_rate" {
            return SetParamsResult::failure(RATE_LOCKED_REASON);
        }
    }
    SetParamsResult::success()
}

fn render(message: &str, count: u64) -> String {
    format!("{message} {count}")
}
