//! Parameter integration tests: the local API, the remote endpoints, and
//! the parameter event topic.

mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::isolated_context;
use node_z::{
    Builder,
    parameter::{
        ParamDescriptor, ParamType, ParamValue, Parameter, SetParamsResult,
        wire::{
            GetParametersRequest, GetParametersSrv, ListParametersRequest, ListParametersSrv,
            ParamEventMsg, SetParametersRequest, SetParametersSrv, WireParam, WireParamValue,
        },
    },
};

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn local_declare_get_set() {
    let ctx = isolated_context();
    let node = ctx.create_node("param_node").build().expect("node");

    let desc = ParamDescriptor::new("my_int", ParamType::Integer);
    let initial = node
        .declare_parameter("my_int", ParamValue::Integer(42), desc)
        .expect("declare");
    assert_eq!(initial, ParamValue::Integer(42));

    assert_eq!(
        node.get_parameter("my_int"),
        Some(ParamValue::Integer(42))
    );

    let result = node.set_parameter(Parameter::new("my_int", 100i64));
    assert!(result.successful);
    assert_eq!(
        node.get_parameter("my_int"),
        Some(ParamValue::Integer(100))
    );

    // Wrong type is rejected with a reason
    let bad = node.set_parameter(Parameter::new("my_int", true));
    assert!(!bad.successful);
    assert!(!bad.reason.is_empty());
}

#[test]
fn validation_hook_rejects_batch() {
    let ctx = isolated_context();
    let node = ctx.create_node("hook_node").build().expect("node");

    node.declare_parameter(
        "speed",
        ParamValue::Double(1.0),
        ParamDescriptor::default(),
    )
    .expect("declare");

    node.on_set_parameters(|params| {
        for p in params {
            if let ParamValue::Double(v) = &p.value
                && *v > 10.0
            {
                return SetParamsResult::failure(format!("speed {} exceeds maximum 10.0", v));
            }
        }
        SetParamsResult::success()
    });

    let ok = node.set_parameter(Parameter::new("speed", 5.0));
    assert!(ok.successful);

    let bad = node.set_parameter(Parameter::new("speed", 15.0));
    assert!(!bad.successful);
    assert!(bad.reason.contains("maximum"));

    // Value unchanged after rejection
    assert_eq!(node.get_parameter("speed"), Some(ParamValue::Double(5.0)));
}

#[test]
fn overrides_replace_defaults() {
    let ctx = isolated_context();

    let mut overrides = HashMap::new();
    overrides.insert("count".to_string(), ParamValue::Integer(99));

    let node = ctx
        .create_node("override_node")
        .with_parameter_overrides(overrides)
        .build()
        .expect("node");

    let initial = node
        .declare_parameter(
            "count",
            ParamValue::Integer(1),
            ParamDescriptor::new("count", ParamType::Integer),
        )
        .expect("declare");
    assert_eq!(initial, ParamValue::Integer(99));
}

#[test]
fn remote_set_parameters_matches_local_api() {
    let ctx = isolated_context();
    let node = ctx.create_node("remote_param_node").build().expect("node");
    let caller = ctx.create_node("caller_node").build().expect("caller");

    node.declare_parameter(
        "message",
        ParamValue::String("hello".into()),
        ParamDescriptor::default(),
    )
    .expect("declare");

    let client = caller
        .create_client::<SetParametersSrv>("/remote_param_node/set_parameters")
        .build()
        .expect("client");

    let request = SetParametersRequest {
        parameters: vec![
            WireParam::from_parameter(&Parameter::new("message", "changed")),
            WireParam::from_parameter(&Parameter::new("ghost", 1i64)),
        ],
    };
    let response = client.call(&request, CALL_TIMEOUT).expect("call");

    assert_eq!(response.results.len(), 2);
    assert!(response.results[0].successful);
    assert!(!response.results[1].successful);
    assert!(response.results[1].reason.contains("not declared"));

    assert_eq!(
        node.get_parameter("message"),
        Some(ParamValue::String("changed".into()))
    );
}

#[test]
fn remote_get_and_list_parameters() {
    let ctx = isolated_context();
    let node = ctx.create_node("listing_node").build().expect("node");
    let caller = ctx.create_node("listing_caller").build().expect("caller");

    node.declare_parameter(
        "rate",
        ParamValue::Double(2.0),
        ParamDescriptor::default(),
    )
    .expect("declare");
    node.declare_parameter(
        "message",
        ParamValue::String("hi".into()),
        ParamDescriptor::default(),
    )
    .expect("declare");

    let get_client = caller
        .create_client::<GetParametersSrv>("/listing_node/get_parameters")
        .build()
        .expect("get client");
    let response = get_client
        .call(
            &GetParametersRequest {
                names: vec!["rate".to_string(), "unknown".to_string()],
            },
            CALL_TIMEOUT,
        )
        .expect("call");
    assert_eq!(response.values.len(), 2);
    assert_eq!(response.values[0].to_value(), ParamValue::Double(2.0));
    assert_eq!(response.values[1].to_value(), ParamValue::NotSet);

    let list_client = caller
        .create_client::<ListParametersSrv>("/listing_node/list_parameters")
        .build()
        .expect("list client");
    let response = list_client
        .call(&ListParametersRequest { prefixes: vec![] }, CALL_TIMEOUT)
        .expect("call");
    assert_eq!(
        response.names,
        vec!["message".to_string(), "rate".to_string()]
    );
}

#[test]
fn commit_publishes_parameter_event() {
    let ctx = isolated_context();
    let node = ctx.create_node("event_node").build().expect("node");
    let watcher = ctx.create_node("event_watcher").build().expect("watcher");

    node.declare_parameter(
        "message",
        ParamValue::String("a".into()),
        ParamDescriptor::default(),
    )
    .expect("declare");

    let events = watcher
        .create_sub::<ParamEventMsg>("/parameter_events")
        .build()
        .expect("sub");

    let result = node.set_parameter(Parameter::new("message", "b"));
    assert!(result.successful);

    let event = events.recv_timeout(CALL_TIMEOUT).expect("event");
    assert_eq!(event.node, "/event_node");
    assert_eq!(
        event.changed_parameters,
        vec![WireParam {
            name: "message".to_string(),
            value: WireParamValue::from_value(&ParamValue::String("b".into())),
        }]
    );
}

#[test]
fn atomic_batch_commits_nothing_on_failure() {
    let ctx = isolated_context();
    let node = ctx.create_node("atomic_node").build().expect("node");

    node.declare_parameter(
        "message",
        ParamValue::String("a".into()),
        ParamDescriptor::default(),
    )
    .expect("declare");

    let combined = node.set_parameters_atomically(&[
        Parameter::new("message", "b"),
        Parameter::new("ghost", 1i64),
    ]);
    assert!(!combined.successful);
    assert_eq!(
        node.get_parameter("message"),
        Some(ParamValue::String("a".into()))
    );
}
