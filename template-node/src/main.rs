use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use node_z::context::ContextBuilder;
use node_z::parameter::ParamValue;
use node_z::{Builder, Result};
use template_node::TemplateNode;

#[derive(Parser, Debug)]
#[command(name = "template-node", about = "Timer-driven publisher with echo relay and validated live parameters")]
struct Args {
    /// Zenoh config file (JSON5)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Endpoints to connect to, e.g. tcp/127.0.0.1:7447
    #[arg(long)]
    connect: Vec<String>,

    /// Session mode (peer, client, router)
    #[arg(long)]
    mode: Option<String>,

    /// Domain id used as the first segment of every topic key
    #[arg(long, default_value_t = 0)]
    domain_id: usize,

    /// Node namespace, e.g. /robot1
    #[arg(long, default_value = "")]
    namespace: String,

    /// Parameter override, name=value; repeatable. Values parse as bool,
    /// integer, double, then fall back to string.
    #[arg(short = 'p', long = "param")]
    params: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut builder = ContextBuilder::default().with_domain_id(args.domain_id);
    if let Some(config) = args.config {
        builder = builder.with_config_file(config);
    }
    if !args.connect.is_empty() {
        builder = builder.with_connect_endpoints(args.connect);
    }
    if let Some(mode) = args.mode {
        builder = builder.with_mode(mode);
    }
    let ctx = builder.build()?;

    let node = ctx
        .create_node("template_node")
        .with_namespace(&args.namespace)
        .with_parameter_overrides(parse_overrides(&args.params)?)
        .build()?;
    let template = TemplateNode::new(node)?;

    info!(
        "template node up: {} (period {:?})",
        template.node().fqn(),
        template.loop_period()
    );

    // Delivery and scheduling belong to the session and the timer thread;
    // nothing is left for the main thread to do.
    loop {
        std::thread::park();
    }
}

fn parse_overrides(specs: &[String]) -> Result<HashMap<String, ParamValue>> {
    let mut overrides = HashMap::new();
    for spec in specs {
        let Some((name, value)) = spec.split_once('=') else {
            return Err(format!("Invalid parameter override '{spec}'. Expected 'name=value'").into());
        };
        overrides.insert(name.trim().to_string(), parse_value(value.trim()));
    }
    Ok(overrides)
}

fn parse_value(value: &str) -> ParamValue {
    if let Ok(b) = value.parse::<bool>() {
        return ParamValue::Bool(b);
    }
    if let Ok(i) = value.parse::<i64>() {
        return ParamValue::Integer(i);
    }
    if let Ok(f) = value.parse::<f64>() {
        return ParamValue::Double(f);
    }
    ParamValue::String(value.to_string())
}
