use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Configuration for a chat-completion provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The kind of provider, e.g. "openai".
    pub provider_type: String,

    /// Base URL for API requests; the provider's public endpoint when
    /// absent.
    pub api_base: Option<String>,

    /// API key for authentication.
    pub api_key: String,

    /// Model requested for every completion.
    pub default_model: String,

    /// Additional provider-specific options.
    #[serde(default)]
    pub options: HashMap<String, String>,
}

/// One declared parameter of a callable function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionParameter {
    pub name: String,

    pub description: String,

    /// JSON Schema type: string, number, boolean, ...
    pub parameter_type: String,

    pub required: bool,

    /// For enum-like parameters, the allowed values.
    pub enum_values: Option<Vec<String>>,
}

impl FunctionParameter {
    pub fn required(name: &str, parameter_type: &str, description: &str) -> Self {
        FunctionParameter {
            name: name.to_string(),
            description: description.to_string(),
            parameter_type: parameter_type.to_string(),
            required: true,
            enum_values: None,
        }
    }

    pub fn optional(name: &str, parameter_type: &str, description: &str) -> Self {
        FunctionParameter {
            required: false,
            ..Self::required(name, parameter_type, description)
        }
    }

    pub fn with_enum_values(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}
