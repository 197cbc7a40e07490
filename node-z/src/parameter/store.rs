//! Parameter storage with validation.
//!
//! `ParamStore` holds all declared parameters for a node. It enforces
//! declaration-before-use, type constraints, and read-only restrictions.

use std::collections::HashMap;

use super::types::{ParamDescriptor, ParamType, ParamValue, Parameter};

/// Internal storage entry for a single parameter.
#[derive(Debug, Clone)]
pub(crate) struct ParamEntry {
    pub value: ParamValue,
    pub descriptor: ParamDescriptor,
}

/// Parameter store holding all declared parameters for a node.
#[derive(Debug)]
pub(crate) struct ParamStore {
    parameters: HashMap<String, ParamEntry>,
    /// Parameter overrides applied at declaration time.
    overrides: HashMap<String, ParamValue>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self {
            parameters: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_overrides(overrides: HashMap<String, ParamValue>) -> Self {
        Self {
            parameters: HashMap::new(),
            overrides,
        }
    }

    /// Declare a parameter with a default value and descriptor.
    ///
    /// If an override exists for this parameter name, the override value is
    /// used instead of the default. Returns the actual initial value.
    pub fn declare(
        &mut self,
        name: &str,
        default: ParamValue,
        mut descriptor: ParamDescriptor,
    ) -> Result<ParamValue, String> {
        if self.parameters.contains_key(name) {
            return Err(format!("Parameter '{}' already declared", name));
        }

        let initial_value = self.overrides.remove(name).unwrap_or(default);

        // Infer type from value if the descriptor left it unset
        if descriptor.type_ == ParamType::NotSet {
            descriptor.type_ = initial_value.param_type();
        }
        descriptor.name = name.to_string();

        if descriptor.type_ != ParamType::NotSet
            && initial_value.param_type() != descriptor.type_
        {
            return Err(format!(
                "Invalid initial value for parameter '{}': expected type {:?}, got {:?}",
                name,
                descriptor.type_,
                initial_value.param_type()
            ));
        }

        let entry = ParamEntry {
            value: initial_value.clone(),
            descriptor,
        };
        self.parameters.insert(name.to_string(), entry);

        Ok(initial_value)
    }

    /// Get the value of a parameter.
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.parameters.get(name).map(|e| e.value.clone())
    }

    /// Get the descriptor of a parameter.
    pub fn describe(&self, name: &str) -> Option<ParamDescriptor> {
        self.parameters.get(name).map(|e| e.descriptor.clone())
    }

    /// Validate a parameter change without committing it.
    pub fn validate_set(&self, param: &Parameter) -> Result<(), String> {
        match self.parameters.get(&param.name) {
            Some(entry) => {
                if entry.descriptor.read_only {
                    return Err(format!("Parameter '{}' is read-only", param.name));
                }

                if entry.descriptor.type_ != ParamType::NotSet
                    && param.value.param_type() != entry.descriptor.type_
                {
                    return Err(format!(
                        "Parameter '{}': type mismatch, expected {:?} but got {:?}",
                        param.name,
                        entry.descriptor.type_,
                        param.value.param_type()
                    ));
                }

                Ok(())
            }
            None => Err(format!("Parameter '{}' not declared", param.name)),
        }
    }

    /// Set a parameter value. Must be validated first. Returns the old value.
    pub fn set(&mut self, param: &Parameter) -> Option<ParamValue> {
        self.parameters
            .get_mut(&param.name)
            .map(|entry| std::mem::replace(&mut entry.value, param.value.clone()))
    }

    /// List declared parameter names matching any of the given prefixes
    /// (all names when no prefix is given), sorted.
    pub fn list(&self, prefixes: &[String]) -> Vec<String> {
        let mut names: Vec<String> = self
            .parameters
            .keys()
            .filter(|name| {
                prefixes.is_empty()
                    || prefixes.iter().any(|prefix| {
                        prefix.is_empty()
                            || name.as_str() == prefix
                            || name.starts_with(&format!("{}.", prefix))
                    })
            })
            .cloned()
            .collect();
        names.sort();
        names
    }
}
