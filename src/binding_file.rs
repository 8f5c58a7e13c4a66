//! Binding files (v0.1)
//!
//! Declarative table mappings kept next to the application instead of in
//! code:
//! ```yaml
//! schema: signal-connect/bindings@0.1
//! graph: login
//! outputs:
//!   loginInProgress: loginInProgress$
//!   username: username$
//! inputs:
//!   usernameChanged: username$
//!   submitButton: submitButton$
//! ```
//! A missing or `null` side stays absent.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ConnectError, Side};
use crate::mapping::{mapping_from_yaml, InputMapping, OutputMapping};

/// Schema tag every binding file must carry
pub const SCHEMA: &str = "signal-connect/bindings@0.1";

#[derive(Debug, Clone, Deserialize)]
pub struct BindingFile {
    pub schema: String,
    /// Name of the graph the tables refer to
    pub graph: String,
    #[serde(default)]
    outputs: serde_yaml::Value,
    #[serde(default)]
    inputs: serde_yaml::Value,
}

impl BindingFile {
    /// Parse and check the schema tag
    pub fn parse(yaml: &str) -> Result<Self, ConnectError> {
        let file: BindingFile = serde_yaml::from_str(yaml)?;
        if file.schema != SCHEMA {
            return Err(ConnectError::InvalidSchema {
                expected: SCHEMA.to_string(),
                found: file.schema,
            });
        }
        Ok(file)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConnectError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::parse(&yaml)
    }

    pub fn output_mapping(&self) -> Result<OutputMapping, ConnectError> {
        mapping_from_yaml(Side::Outputs, &self.outputs)
    }

    pub fn input_mapping(&self) -> Result<InputMapping, ConnectError> {
        mapping_from_yaml(Side::Inputs, &self.inputs)
    }
}
