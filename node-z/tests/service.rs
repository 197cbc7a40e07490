//! Service integration tests: callback servers, queue-mode servers, and
//! client behavior without a server.

mod common;

use std::time::Duration;

use common::isolated_context;
use node_z::{
    Builder,
    msg::Service,
    msgs::{StringMsg, Trigger, TriggerRequest},
};

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

struct Shout;

impl Service for Shout {
    type Request = StringMsg;
    type Response = StringMsg;
}

#[test]
fn callback_server_answers_request() {
    let ctx = isolated_context();
    let server_node = ctx.create_node("srv_node").build().expect("server node");
    let client_node = ctx.create_node("cln_node").build().expect("client node");

    let _server = server_node
        .create_service::<Shout>("shout")
        .build_with_callback(|req| StringMsg::new(req.data.to_uppercase()))
        .expect("server");

    let client = client_node
        .create_client::<Shout>("shout")
        .build()
        .expect("client");

    let response = client
        .call(&StringMsg::new("quiet"), CALL_TIMEOUT)
        .expect("call");
    assert_eq!(response.data, "QUIET");
}

#[test]
fn trigger_service_round_trip() {
    let ctx = isolated_context();
    let server_node = ctx.create_node("trig_srv_node").build().expect("server node");
    let client_node = ctx.create_node("trig_cln_node").build().expect("client node");

    let _server = server_node
        .create_service::<Trigger>("fire")
        .build_with_callback(|_req| node_z::msgs::TriggerResponse {
            success: true,
            message: "fired".to_string(),
        })
        .expect("server");

    let client = client_node
        .create_client::<Trigger>("fire")
        .build()
        .expect("client");

    let response = client.call(&TriggerRequest {}, CALL_TIMEOUT).expect("call");
    assert!(response.success);
    assert_eq!(response.message, "fired");
}

#[test]
fn queue_server_take_request_send_response() {
    let ctx = isolated_context();
    let server_node = ctx.create_node("q_srv_node").build().expect("server node");
    let client_node = ctx.create_node("q_cln_node").build().expect("client node");

    let mut server = server_node
        .create_service::<Shout>("relay")
        .build()
        .expect("server");

    let worker = std::thread::spawn(move || {
        let (key, request) = server
            .take_request_timeout(CALL_TIMEOUT)
            .expect("take request");
        server
            .send_response(&StringMsg::new(format!("{}!", request.data)), &key)
            .expect("send response");
    });

    let client = client_node
        .create_client::<Shout>("relay")
        .build()
        .expect("client");
    let response = client
        .call(&StringMsg::new("hey"), CALL_TIMEOUT)
        .expect("call");
    assert_eq!(response.data, "hey!");

    worker.join().expect("worker");
}

#[test]
fn client_times_out_without_server() {
    let ctx = isolated_context();
    let client_node = ctx.create_node("lonely_cln_node").build().expect("client node");

    let client = client_node
        .create_client::<Trigger>("nobody_home")
        .build()
        .expect("client");

    // Dispatch succeeds even with no server up
    client.send_request(&TriggerRequest {}).expect("send");
    assert!(
        client
            .take_response_timeout(Duration::from_millis(300))
            .is_err()
    );
}
