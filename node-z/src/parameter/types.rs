//! User-facing parameter types.

/// The type of a parameter value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ParamType {
    #[default]
    NotSet,
    Bool,
    Integer,
    Double,
    String,
}

impl ParamType {
    pub fn to_u8(self) -> u8 {
        match self {
            Self::NotSet => 0,
            Self::Bool => 1,
            Self::Integer => 2,
            Self::Double => 3,
            Self::String => 4,
        }
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Bool,
            2 => Self::Integer,
            3 => Self::Double,
            4 => Self::String,
            _ => Self::NotSet,
        }
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ParamValue {
    #[default]
    NotSet,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(std::string::String),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::NotSet => ParamType::NotSet,
            Self::Bool(_) => ParamType::Bool,
            Self::Integer(_) => ParamType::Integer,
            Self::Double(_) => ParamType::Double,
            Self::String(_) => ParamType::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// A parameter with its name and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: std::string::String,
    pub value: ParamValue,
}

impl Parameter {
    pub fn new(name: impl Into<std::string::String>, value: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Descriptor for a parameter, including constraints.
#[derive(Debug, Clone, Default)]
pub struct ParamDescriptor {
    pub name: std::string::String,
    pub type_: ParamType,
    pub description: std::string::String,
    pub read_only: bool,
}

impl ParamDescriptor {
    pub fn new(name: impl Into<std::string::String>, type_: ParamType) -> Self {
        Self {
            name: name.into(),
            type_,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<std::string::String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Result of a set-parameters operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SetParamsResult {
    pub successful: bool,
    pub reason: std::string::String,
}

impl SetParamsResult {
    pub fn success() -> Self {
        Self {
            successful: true,
            reason: std::string::String::new(),
        }
    }

    pub fn failure(reason: impl Into<std::string::String>) -> Self {
        Self {
            successful: false,
            reason: reason.into(),
        }
    }
}
