//! Wire records for the remote parameter endpoints and the parameter event
//! topic. Flat CDR-friendly shapes; conversions to and from the user-facing
//! types live here.

use serde::{Deserialize, Serialize};

use crate::msg::Service;

use super::types::{ParamType, ParamValue, Parameter, SetParamsResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireParamValue {
    pub r#type: u8,
    pub bool_value: bool,
    pub integer_value: i64,
    pub double_value: f64,
    pub string_value: String,
}

impl WireParamValue {
    pub fn from_value(value: &ParamValue) -> Self {
        let mut wire = Self {
            r#type: value.param_type().to_u8(),
            ..Default::default()
        };
        match value {
            ParamValue::NotSet => {}
            ParamValue::Bool(v) => wire.bool_value = *v,
            ParamValue::Integer(v) => wire.integer_value = *v,
            ParamValue::Double(v) => wire.double_value = *v,
            ParamValue::String(v) => wire.string_value = v.clone(),
        }
        wire
    }

    pub fn to_value(&self) -> ParamValue {
        match ParamType::from_u8(self.r#type) {
            ParamType::NotSet => ParamValue::NotSet,
            ParamType::Bool => ParamValue::Bool(self.bool_value),
            ParamType::Integer => ParamValue::Integer(self.integer_value),
            ParamType::Double => ParamValue::Double(self.double_value),
            ParamType::String => ParamValue::String(self.string_value.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireParam {
    pub name: String,
    pub value: WireParamValue,
}

impl WireParam {
    pub fn from_parameter(param: &Parameter) -> Self {
        Self {
            name: param.name.clone(),
            value: WireParamValue::from_value(&param.value),
        }
    }

    pub fn to_parameter(&self) -> Parameter {
        Parameter {
            name: self.name.clone(),
            value: self.value.to_value(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireSetParamsResult {
    pub successful: bool,
    pub reason: String,
}

impl WireSetParamsResult {
    pub fn from_result(result: &SetParamsResult) -> Self {
        Self {
            successful: result.successful,
            reason: result.reason.clone(),
        }
    }

    pub fn to_result(&self) -> SetParamsResult {
        SetParamsResult {
            successful: self.successful,
            reason: self.reason.clone(),
        }
    }
}

// ── Service records ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParametersRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetParametersResponse {
    pub values: Vec<WireParamValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetParametersRequest {
    pub parameters: Vec<WireParam>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetParametersResponse {
    pub results: Vec<WireSetParamsResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListParametersRequest {
    pub prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListParametersResponse {
    pub names: Vec<String>,
}

pub struct GetParametersSrv;

impl Service for GetParametersSrv {
    type Request = GetParametersRequest;
    type Response = GetParametersResponse;
}

pub struct SetParametersSrv;

impl Service for SetParametersSrv {
    type Request = SetParametersRequest;
    type Response = SetParametersResponse;
}

pub struct ListParametersSrv;

impl Service for ListParametersSrv {
    type Request = ListParametersRequest;
    type Response = ListParametersResponse;
}

/// Published on the `parameter_events` topic after every successful commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamEventMsg {
    /// Fully-qualified name of the node whose parameters changed.
    pub node: String,
    pub changed_parameters: Vec<WireParam>,
}
