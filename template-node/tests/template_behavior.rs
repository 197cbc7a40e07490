//! End-to-end behavior of the template node: tick sequence, counter resets,
//! live message changes, the frozen loop rate, and the echo relay.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use node_z::context::{Context, ContextBuilder};
use node_z::msgs::{StringMsg, Trigger, TriggerRequest};
use node_z::parameter::{
    ParamValue, Parameter,
    wire::{SetParametersRequest, SetParametersSrv, WireParam},
};
use node_z::pubsub::Sub;
use node_z::{Builder, Result};
use template_node::{DEFAULT_MESSAGE, RATE_LOCKED_REASON, TemplateNode};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);
/// 20 Hz keeps the tests fast without racing the scheduler.
const TEST_RATE: f64 = 20.0;

fn isolated_context() -> Context {
    ContextBuilder::default()
        .with_mode("peer")
        .disable_multicast_scouting()
        .with_json("listen/endpoints", Vec::<String>::new())
        .build()
        .expect("context")
}

fn fast_template(ctx: &Context) -> TemplateNode {
    let mut overrides = HashMap::new();
    overrides.insert("main_loop_rate".to_string(), ParamValue::Double(TEST_RATE));
    let node = ctx
        .create_node("template_node")
        .with_parameter_overrides(overrides)
        .build()
        .expect("node");
    TemplateNode::new(node).expect("template node")
}

/// Receive messages until one satisfies the predicate, or fail after
/// `RECV_TIMEOUT` overall.
fn recv_until(sub: &Sub<StringMsg>, predicate: impl Fn(&str) -> bool) -> Result<StringMsg> {
    let deadline = Instant::now() + RECV_TIMEOUT;
    loop {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .ok_or("timed out waiting for matching message")?;
        let msg = sub.recv_timeout(remaining)?;
        if predicate(&msg.data) {
            return Ok(msg);
        }
    }
}

#[test]
fn ticks_count_up_from_zero_and_reset_restarts() {
    let ctx = isolated_context();
    let watcher = ctx.create_node("watcher").build().expect("watcher");
    let sub = watcher
        .create_sub::<StringMsg>("message")
        .build()
        .expect("sub");

    let _template = fast_template(&ctx);

    // First two ticks publish the defaults, counting from zero
    let first = sub.recv_timeout(RECV_TIMEOUT).expect("first tick");
    assert_eq!(first.data, "Hello World 0");
    let second = sub.recv_timeout(RECV_TIMEOUT).expect("second tick");
    assert_eq!(second.data, "Hello World 1");

    // Reset always succeeds
    let client = watcher
        .create_client::<Trigger>("reset_counter")
        .build()
        .expect("client");
    let response = client
        .call(&TriggerRequest {}, RECV_TIMEOUT)
        .expect("reset call");
    assert!(response.success);

    // Ticks already in flight may still carry old values; the count restarts
    // at zero and climbs again
    let zero = recv_until(&sub, |data| data == "Hello World 0").expect("post-reset zero");
    assert_eq!(zero.data, "Hello World 0");
    let next = sub.recv_timeout(RECV_TIMEOUT).expect("post-reset one");
    assert_eq!(next.data, "Hello World 1");
}

#[test]
fn message_change_is_live_and_resets_counter() {
    let ctx = isolated_context();
    let watcher = ctx.create_node("watcher").build().expect("watcher");
    let sub = watcher
        .create_sub::<StringMsg>("message")
        .build()
        .expect("sub");

    let template = fast_template(&ctx);

    // Let the counter move past zero first
    recv_until(&sub, |data| data == "Hello World 1").expect("second tick");

    let result = template
        .node()
        .set_parameter(Parameter::new("message", "Hi"));
    assert!(result.successful);

    // The new text appears, and its counter restarts at zero
    let changed = recv_until(&sub, |data| data.starts_with("Hi")).expect("new text");
    assert_eq!(changed.data, "Hi 0");
}

#[test]
fn loop_rate_is_frozen_after_construction() {
    let ctx = isolated_context();
    let watcher = ctx.create_node("watcher").build().expect("watcher");
    let sub = watcher
        .create_sub::<StringMsg>("message")
        .build()
        .expect("sub");

    let template = fast_template(&ctx);
    let period_before = template.loop_period();
    // The override replaced the declared default, and the timer honours it
    assert_eq!(period_before, Duration::from_secs_f64(1.0 / TEST_RATE));

    // Local API rejection: structured failure, fixed reason, no mutation
    let rejected = template
        .node()
        .set_parameter(Parameter::new("main_loop_rate", 5.0));
    assert!(!rejected.successful);
    assert_eq!(rejected.reason, RATE_LOCKED_REASON);
    assert_eq!(
        template.node().get_parameter("main_loop_rate"),
        Some(ParamValue::Double(TEST_RATE))
    );

    // Remote rejection through ~set_parameters: the whole batch fails, and
    // the valid-looking entry is not committed either
    let client = watcher
        .create_client::<SetParametersSrv>("/template_node/set_parameters")
        .build()
        .expect("client");
    let response = client
        .call(
            &SetParametersRequest {
                parameters: vec![
                    WireParam::from_parameter(&Parameter::new("message", "Sneaky")),
                    WireParam::from_parameter(&Parameter::new("main_loop_rate", 1.0)),
                ],
            },
            RECV_TIMEOUT,
        )
        .expect("remote call");
    assert!(response.results.iter().all(|r| !r.successful));
    assert!(response.results.iter().all(|r| r.reason == RATE_LOCKED_REASON));
    assert_eq!(
        template.node().get_parameter("message"),
        Some(ParamValue::String(DEFAULT_MESSAGE.to_string()))
    );

    // The timer keeps running at the original cadence
    assert_eq!(template.loop_period(), period_before);
    sub.recv_timeout(RECV_TIMEOUT).expect("still ticking");
    sub.recv_timeout(RECV_TIMEOUT).expect("still ticking");
}

#[test]
fn shout_is_mirrored_on_echo_verbatim() {
    let ctx = isolated_context();
    let watcher = ctx.create_node("watcher").build().expect("watcher");
    let echo_sub = watcher
        .create_sub::<StringMsg>("echo")
        .build()
        .expect("echo sub");
    let shouter = watcher
        .create_pub::<StringMsg>("shout")
        .build()
        .expect("shout pub");

    let _template = fast_template(&ctx);
    // Give the relay's subscriber a moment to be wired up
    std::thread::sleep(Duration::from_millis(200));

    for text in ["one", "two", "three three three"] {
        shouter.publish(&StringMsg::new(text)).expect("shout");
    }

    for text in ["one", "two", "three three three"] {
        let echoed = echo_sub.recv_timeout(RECV_TIMEOUT).expect("echo");
        assert_eq!(echoed.data, text);
    }

    // Exactly once per delivery: nothing else shows up
    std::thread::sleep(Duration::from_millis(200));
    assert!(echo_sub.try_recv().is_none());
}

#[test]
fn non_positive_rate_rejected_at_construction() {
    let ctx = isolated_context();
    let mut overrides = HashMap::new();
    overrides.insert("main_loop_rate".to_string(), ParamValue::Double(0.0));
    let node = ctx
        .create_node("template_node")
        .with_parameter_overrides(overrides)
        .build()
        .expect("node");
    assert!(TemplateNode::new(node).is_err());
}
