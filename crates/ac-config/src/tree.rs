use ac_core::{AdminError, AdminResult, DataValue};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "yml" | "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parses a configuration document into an untyped tree. The document must
/// be a mapping; an empty document reads as an empty mapping.
pub fn parse_tree(text: &str, format: ConfigFormat) -> AdminResult<DataValue> {
    let tree = match format {
        ConfigFormat::Yaml => {
            let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(text).map_err(|error| {
                AdminError::config("CONFIG_PARSE_YAML", format!("Invalid YAML: {}", error))
            })?;
            yaml_to_value(value)
        }
        ConfigFormat::Json => {
            let value: serde_json::Value = serde_json::from_str(text).map_err(|error| {
                AdminError::config("CONFIG_PARSE_JSON", format!("Invalid JSON: {}", error))
            })?;
            json_to_value(value)
        }
    };
    match tree {
        None => Ok(DataValue::text_map(IndexMap::new())),
        Some(tree) if tree.as_map().is_some() => Ok(tree),
        Some(other) => Err(AdminError::config(
            "CONFIG_NOT_MAPPING",
            format!(
                "Configuration must be a mapping, found: {}",
                other.type_and_value_description()
            ),
        )),
    }
}

/// Nulls disappear, also inside sequences and mappings.
pub fn yaml_to_value(value: serde_yaml_ng::Value) -> Option<DataValue> {
    use serde_yaml_ng::Value;
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(DataValue::Bool(flag)),
        Value::Number(number) => Some(match number.as_i64() {
            Some(integer) => DataValue::Integer(integer),
            None => DataValue::Float(number.as_f64().unwrap_or_default()),
        }),
        Value::String(text) => Some(DataValue::Text(text)),
        Value::Sequence(items) => Some(DataValue::list(
            items.into_iter().filter_map(yaml_to_value).collect(),
        )),
        Value::Mapping(mapping) => {
            let mut entries = IndexMap::new();
            for (key, value) in mapping {
                let Some(key) = yaml_key(key) else {
                    continue;
                };
                if let Some(value) = yaml_to_value(value) {
                    entries.insert(key, value);
                }
            }
            Some(DataValue::text_map(entries))
        }
        Value::Tagged(tagged) => yaml_to_value(tagged.value),
    }
}

fn yaml_key(key: serde_yaml_ng::Value) -> Option<String> {
    use serde_yaml_ng::Value;
    match key {
        Value::String(text) => Some(text),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub fn json_to_value(value: serde_json::Value) -> Option<DataValue> {
    use serde_json::Value;
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(DataValue::Bool(flag)),
        Value::Number(number) => Some(match number.as_i64() {
            Some(integer) => DataValue::Integer(integer),
            None => DataValue::Float(number.as_f64().unwrap_or_default()),
        }),
        Value::String(text) => Some(DataValue::Text(text)),
        Value::Array(items) => Some(DataValue::list(
            items.into_iter().filter_map(json_to_value).collect(),
        )),
        Value::Object(object) => Some(DataValue::text_map(
            object
                .into_iter()
                .filter_map(|(key, value)| json_to_value(value).map(|value| (key, value)))
                .collect(),
        )),
    }
}

/// Top-level keys of `user` replace those of `defaults`; everything else is
/// kept in the defaults' order.
pub fn overlay(defaults: &DataValue, user: &DataValue) -> DataValue {
    let mut entries = top_level(defaults);
    for (key, value) in top_level(user) {
        entries.insert(key, value);
    }
    DataValue::text_map(entries)
}

fn top_level(tree: &DataValue) -> IndexMap<String, DataValue> {
    tree.as_map()
        .map(|map| {
            map.borrow()
                .iter()
                .map(|(key, value)| (key.to_text(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}
