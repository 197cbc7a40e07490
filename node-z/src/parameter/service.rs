//! Remote parameter endpoints.
//!
//! Registers the `~get_parameters`, `~set_parameters`, and
//! `~list_parameters` services for a node, each a callback-mode server
//! delegating to the node's [`ParamHost`]. A remote caller gets the same
//! validation pipeline (and the same structured rejections) as the local
//! parameter API.

use std::sync::Arc;

use tracing::debug;
use zenoh::{Result, Session};

use crate::context::IdCounter;
use crate::entity::{EndpointEntity, EntityKind, NodeEntity};
use crate::service::{Server, ServerBuilder};

use super::host::ParamHost;
use super::wire::{
    GetParametersRequest, GetParametersResponse, GetParametersSrv, ListParametersRequest,
    ListParametersResponse, ListParametersSrv, SetParametersRequest, SetParametersResponse,
    SetParametersSrv, WireParamValue, WireSetParamsResult,
};

pub struct ParamServices {
    _get_server: Server<GetParametersSrv>,
    _set_server: Server<SetParametersSrv>,
    _list_server: Server<ListParametersSrv>,
}

impl ParamServices {
    pub(crate) fn new(
        session: Arc<Session>,
        node: &NodeEntity,
        counter: &IdCounter,
        host: Arc<ParamHost>,
    ) -> Result<Self> {
        let make_entity = |service_name: &str, type_name: &str| EndpointEntity {
            id: counter.increment(),
            node: node.clone(),
            kind: EntityKind::Service,
            topic: service_name.to_string(),
            type_name: Some(type_name.to_string()),
            ..Default::default()
        };

        let get_server = {
            let host = host.clone();
            let builder: ServerBuilder<GetParametersSrv> = ServerBuilder {
                entity: make_entity("~get_parameters", "rcl_interfaces/srv/GetParameters"),
                session: session.clone(),
                _phantom_data: Default::default(),
            };
            builder.build_with_callback(move |req| handle_get_parameters(&host, req))?
        };

        let set_server = {
            let host = host.clone();
            let builder: ServerBuilder<SetParametersSrv> = ServerBuilder {
                entity: make_entity("~set_parameters", "rcl_interfaces/srv/SetParameters"),
                session: session.clone(),
                _phantom_data: Default::default(),
            };
            builder.build_with_callback(move |req| handle_set_parameters(&host, req))?
        };

        let list_server = {
            let host = host.clone();
            let builder: ServerBuilder<ListParametersSrv> = ServerBuilder {
                entity: make_entity("~list_parameters", "rcl_interfaces/srv/ListParameters"),
                session,
                _phantom_data: Default::default(),
            };
            builder.build_with_callback(move |req| handle_list_parameters(&host, req))?
        };

        debug!("[PAR] Parameter services ready: node={}", host.node_fqn());

        Ok(Self {
            _get_server: get_server,
            _set_server: set_server,
            _list_server: list_server,
        })
    }
}

fn handle_get_parameters(host: &ParamHost, req: GetParametersRequest) -> GetParametersResponse {
    debug!("[PAR] get_parameters: {:?}", req.names);
    let values = req
        .names
        .iter()
        .map(|name| {
            host.get(name)
                .map(|v| WireParamValue::from_value(&v))
                .unwrap_or_default()
        })
        .collect();
    GetParametersResponse { values }
}

fn handle_set_parameters(host: &ParamHost, req: SetParametersRequest) -> SetParametersResponse {
    debug!("[PAR] set_parameters: {} params", req.parameters.len());
    let params: Vec<_> = req.parameters.iter().map(|p| p.to_parameter()).collect();
    let results = host
        .set_parameters(&params, false)
        .iter()
        .map(WireSetParamsResult::from_result)
        .collect();
    SetParametersResponse { results }
}

fn handle_list_parameters(host: &ParamHost, req: ListParametersRequest) -> ListParametersResponse {
    debug!("[PAR] list_parameters: prefixes={:?}", req.prefixes);
    ListParametersResponse {
        names: host.list(&req.prefixes),
    }
}
