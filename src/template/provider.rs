//! Serialization strategies for rendered templates

use serde_json::{json, Map};

use crate::model::{ResourceInstance, ResourceName, ResourceType, Value};

/// Pluggable strategy turning resources and references into structured output
///
/// Implementations are stateless; the same provider may render any number of
/// templates.
pub trait Provider {
    /// Short name used to select the provider from configuration
    fn name(&self) -> &str;

    /// Render a reference to `target` as a whole, found on `source`
    fn serialize_ref(&self, source: &ResourceType, target: &ResourceName) -> serde_json::Value;

    /// Render a reference to attribute `attr_name` of `target`, found on `source`
    fn serialize_attr(
        &self,
        source: &ResourceType,
        target: &ResourceName,
        attr_name: &str,
    ) -> serde_json::Value;

    /// Render one resource instance
    fn serialize_resource(&self, resource: &ResourceInstance) -> serde_json::Value;

    /// Render a field value, substituting every nested reference
    fn serialize_value(&self, source: &ResourceType, value: &Value) -> serde_json::Value {
        match value {
            Value::Ref(r) => self.serialize_ref(source, &r.target),
            Value::Attr(r) => self.serialize_attr(source, &r.target, &r.attribute),
            Value::List(items) => items
                .iter()
                .map(|item| self.serialize_value(source, item))
                .collect(),
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.serialize_value(source, v)))
                    .collect(),
            ),
            plain => plain.to_json(),
        }
    }

    /// Render every field of `resource` in declaration order
    fn serialize_properties(&self, resource: &ResourceInstance) -> Map<String, serde_json::Value> {
        let source = resource.resource_type();
        resource
            .fields()
            .map(|(name, value)| (name.to_string(), self.serialize_value(source, value)))
            .collect()
    }
}

/// Format-neutral JSON shape: `{"$ref": T}` and `{"$attr": "T.attr"}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonProvider;

impl Provider for JsonProvider {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize_ref(&self, _source: &ResourceType, target: &ResourceName) -> serde_json::Value {
        json!({ "$ref": target.as_str() })
    }

    fn serialize_attr(
        &self,
        _source: &ResourceType,
        target: &ResourceName,
        attr_name: &str,
    ) -> serde_json::Value {
        json!({ "$attr": format!("{}.{}", target, attr_name) })
    }

    fn serialize_resource(&self, resource: &ResourceInstance) -> serde_json::Value {
        json!({
            "type": resource.type_name().as_str(),
            "properties": self.serialize_properties(resource),
        })
    }
}

/// CloudFormation-style intrinsics: `{"Ref": T}` and `{"Fn::GetAtt": [T, attr]}`
#[derive(Debug, Clone, Copy, Default)]
pub struct IntrinsicProvider;

impl Provider for IntrinsicProvider {
    fn name(&self) -> &str {
        "intrinsic"
    }

    fn serialize_ref(&self, _source: &ResourceType, target: &ResourceName) -> serde_json::Value {
        json!({ "Ref": target.as_str() })
    }

    fn serialize_attr(
        &self,
        _source: &ResourceType,
        target: &ResourceName,
        attr_name: &str,
    ) -> serde_json::Value {
        json!({ "Fn::GetAtt": [target.as_str(), attr_name] })
    }

    fn serialize_resource(&self, resource: &ResourceInstance) -> serde_json::Value {
        json!({
            "Type": resource.type_name().as_str(),
            "Properties": self.serialize_properties(resource),
        })
    }
}

/// Look up a built-in provider by its [`Provider::name`]
pub fn provider_by_name(name: &str) -> Option<Box<dyn Provider>> {
    match name {
        "json" => Some(Box::new(JsonProvider)),
        "intrinsic" | "cfn" => Some(Box::new(IntrinsicProvider)),
        _ => None,
    }
}
