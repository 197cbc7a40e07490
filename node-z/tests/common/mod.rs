use node_z::{
    Builder,
    context::{Context, ContextBuilder},
};

/// Build a context whose session cannot see any other session: peer mode,
/// multicast scouting off, no listen endpoints. Nodes created from the same
/// context still reach each other in-process, which is all these tests need.
pub fn isolated_context() -> Context {
    ContextBuilder::default()
        .with_mode("peer")
        .disable_multicast_scouting()
        .with_json("listen/endpoints", Vec::<String>::new())
        .build()
        .expect("context")
}
