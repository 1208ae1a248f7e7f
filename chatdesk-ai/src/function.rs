use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::FunctionParameter;

/// Call names that capture visitor contact details. The orchestrator
/// filters these out once a contact is on file.
pub const ASK_FOR_CONTACT: &str = "askForContact";
pub const COLLECT_CONTACT_INFO: &str = "collectContactInfo";

pub fn is_contact_call(name: &str) -> bool {
    name == ASK_FOR_CONTACT || name == COLLECT_CONTACT_INFO
}

/// A function as declared to the oracle. The server does not execute
/// these itself (the contact capture aside); calls ride back to the
/// widget verbatim, so names and argument shapes are client contract.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<FunctionParameter>,
}

/// Wire form of a function declaration: JSON Schema parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionSpec {
    pub fn new(name: &str, description: &str) -> Self {
        FunctionSpec {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: FunctionParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Convert to the schema form providers put on the wire.
    pub fn to_schema(&self) -> FunctionSchema {
        FunctionSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: build_parameters_schema(&self.parameters),
        }
    }
}

/// Builds the JSON Schema object describing a parameter list.
pub fn build_parameters_schema(parameters: &[FunctionParameter]) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for parameter in parameters {
        let mut property = serde_json::Map::new();
        property.insert("type".to_string(), json!(parameter.parameter_type));
        property.insert("description".to_string(), json!(parameter.description));
        if let Some(values) = &parameter.enum_values {
            property.insert("enum".to_string(), json!(values));
        }
        properties.insert(parameter.name.clone(), Value::Object(property));

        if parameter.required {
            required.push(json!(parameter.name));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// The fixed catalog the sales-assistant widget understands.
pub fn default_catalog() -> Vec<FunctionSpec> {
    vec![
        FunctionSpec::new(
            "navigateTo",
            "Navigate the visitor's browser to a page on this site",
        )
        .with_parameter(FunctionParameter::required(
            "path",
            "string",
            "Absolute path of the target page, e.g. /pricing",
        )),
        FunctionSpec::new(
            ASK_FOR_CONTACT,
            "Show the contact form so the visitor can leave their details",
        )
        .with_parameter(FunctionParameter::optional(
            "reason",
            "string",
            "Short explanation of why contact details are requested",
        )),
        FunctionSpec::new(
            COLLECT_CONTACT_INFO,
            "Save contact details the visitor provided in the conversation",
        )
        .with_parameter(FunctionParameter::required(
            "name",
            "string",
            "The visitor's name",
        ))
        .with_parameter(FunctionParameter::required(
            "contact",
            "string",
            "Email address or phone number",
        ))
        .with_parameter(FunctionParameter::optional(
            "message",
            "string",
            "What the visitor wants to talk about",
        )),
        FunctionSpec::new("startGame", "Start the discount mini-game overlay"),
        FunctionSpec::new("triggerEffect", "Play a visual effect in the widget").with_parameter(
            FunctionParameter::required("effect", "string", "Which effect to play")
                .with_enum_values(&["confetti", "sparkles"]),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lists_required_parameters() {
        let spec = FunctionSpec::new("collectContactInfo", "Save contact details")
            .with_parameter(FunctionParameter::required("name", "string", "Name"))
            .with_parameter(FunctionParameter::required("contact", "string", "Email"))
            .with_parameter(FunctionParameter::optional("message", "string", "Note"));

        let schema = spec.to_schema();
        assert_eq!(schema.name, "collectContactInfo");
        assert_eq!(schema.parameters["type"], "object");
        assert_eq!(
            schema.parameters["properties"]["contact"]["type"],
            "string"
        );
        let required = schema.parameters["required"].as_array().unwrap();
        assert_eq!(required.len(), 2);
        assert!(required.contains(&json!("name")));
        assert!(!required.contains(&json!("message")));
    }

    #[test]
    fn test_enum_values_appear_in_schema() {
        let spec = FunctionSpec::new("triggerEffect", "Play an effect").with_parameter(
            FunctionParameter::required("effect", "string", "Which effect")
                .with_enum_values(&["confetti", "sparkles"]),
        );
        let schema = spec.to_schema();
        assert_eq!(
            schema.parameters["properties"]["effect"]["enum"],
            json!(["confetti", "sparkles"])
        );
    }

    #[test]
    fn test_default_catalog_names() {
        let names: Vec<String> = default_catalog().into_iter().map(|f| f.name).collect();
        assert_eq!(
            names,
            vec![
                "navigateTo",
                "askForContact",
                "collectContactInfo",
                "startGame",
                "triggerEffect",
            ]
        );
    }

    #[test]
    fn test_contact_call_names() {
        assert!(is_contact_call(ASK_FOR_CONTACT));
        assert!(is_contact_call(COLLECT_CONTACT_INFO));
        assert!(!is_contact_call("navigateTo"));
    }
}
