use std::any::Any;
use std::rc::Rc;

use ac_core::{AdminError, AdminResult, DataKey, DataObject, DataValue, ValueType};
use indexmap::IndexMap;
use tracing::info;

use crate::module::OperationModule;
use crate::registry::{Registrable, RegistrationSlot};
use crate::storage::Storage;

pub const CONFIGURATION_TEMPLATE_TYPE: &str = "configuration-template";

/// Reusable configuration fragment. Strings of the exact form `$name`,
/// values and keys alike, are replaced on expansion.
pub struct ConfigurationTemplate {
    key: String,
    defaults: IndexMap<String, DataValue>,
    template: DataValue,
    registration: RegistrationSlot,
}

impl ConfigurationTemplate {
    pub fn new(key: &str, defaults: IndexMap<String, DataValue>, template: DataValue) -> Self {
        Self {
            key: key.to_string(),
            defaults,
            template,
            registration: RegistrationSlot::default(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Fresh copy of the template with `variables` substituted, falling back
    /// to the defaults. Entries whose placeholder has no value are dropped.
    pub fn expand(&self, variables: &IndexMap<String, DataValue>) -> DataValue {
        self.substitute(&self.template, variables)
            .unwrap_or_else(|| DataValue::text_map(IndexMap::new()))
    }

    fn lookup(&self, name: &str, variables: &IndexMap<String, DataValue>) -> Option<DataValue> {
        variables
            .get(name)
            .or_else(|| self.defaults.get(name))
            .cloned()
    }

    fn substitute(
        &self,
        value: &DataValue,
        variables: &IndexMap<String, DataValue>,
    ) -> Option<DataValue> {
        if let Some(text) = value.as_text() {
            return match text.strip_prefix('$') {
                Some(name) => self.lookup(name, variables),
                None => Some(value.clone()),
            };
        }
        if let Some(map) = value.as_map() {
            let mut expanded = IndexMap::new();
            for (key, entry) in map.borrow().iter() {
                let key = match key {
                    DataKey::Text(text) if text.starts_with('$') => {
                        match self.lookup(&text[1..], variables) {
                            Some(found) => DataKey::text(found.to_text()),
                            None => continue,
                        }
                    }
                    other => other.clone(),
                };
                if let Some(entry) = self.substitute(entry, variables) {
                    expanded.insert(key, entry);
                }
            }
            return Some(DataValue::map(expanded));
        }
        if let Some(list) = value.as_list() {
            let expanded = list
                .borrow()
                .iter()
                .filter_map(|element| self.substitute(element, variables))
                .collect();
            return Some(DataValue::list(expanded));
        }
        Some(value.clone())
    }
}

impl DataObject for ConfigurationTemplate {
    fn type_name(&self) -> &str {
        CONFIGURATION_TEMPLATE_TYPE
    }

    fn type_description(&self) -> String {
        "Configuration Template".to_string()
    }

    fn describe(&self) -> String {
        self.key.clone()
    }

    fn reference(&self) -> Option<DataValue> {
        self.registration.reference()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl Registrable for ConfigurationTemplate {
    fn registry_key(&self) -> String {
        self.key.clone()
    }

    fn registration(&self) -> &RegistrationSlot {
        &self.registration
    }
}

/// Registers every top-level node of `storage` as a template:
/// `name: { defaults: {...}, template: {...} }`.
pub fn register_configuration_templates(
    module: &OperationModule,
    storage: &Storage,
) -> AdminResult<usize> {
    let mut count = 0;
    for node in storage.nodes() {
        let defaults = node
            .get_map("defaults", &ValueType::map(ValueType::Text, ValueType::Any), true)
            .map(|defaults| text_entries(&defaults))
            .unwrap_or_default();
        node.assert_set("template")?;
        let template = match node.get_storage("template", false) {
            Some(storage) => storage.to_map_value(),
            None => node.get("template").unwrap_or_else(|| DataValue::text_map(IndexMap::new())),
        };
        let key = node.storage_key().to_string();
        if !module.register_configuration_template(ConfigurationTemplate::new(&key, defaults, template)) {
            return Err(AdminError::construction(
                "TEMPLATE_DUPLICATE",
                format!("A configuration template called {} is already registered under that name.", key),
            )
            .with_action("registering configuration templates"));
        }
        count += 1;
    }
    info!(count, "registered configuration templates");
    Ok(count)
}

pub(crate) fn text_entries(map: &DataValue) -> IndexMap<String, DataValue> {
    map.as_map()
        .map(|map| {
            map.borrow()
                .iter()
                .map(|(key, value)| (key.to_text(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod config_template_tests {
    use super::*;

    fn entries(pairs: &[(&str, DataValue)]) -> IndexMap<String, DataValue> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    fn template() -> ConfigurationTemplate {
        let body = DataValue::text_map(entries(&[
            (
                "$name",
                DataValue::text_map(entries(&[
                    ("operation", DataValue::from("info")),
                    ("variables", DataValue::text_map(entries(&[("target", DataValue::from("$target"))]))),
                    ("note", DataValue::from("$missing")),
                ])),
            ),
            ("tags", DataValue::list(vec![DataValue::from("$tag"), DataValue::from("fixed")])),
        ]));
        ConfigurationTemplate::new(
            "inspect",
            entries(&[("name", DataValue::from("show")), ("tag", DataValue::from("default"))]),
            body,
        )
    }

    #[test]
    fn placeholders_use_variables_then_defaults() {
        let expanded = template().expand(&entries(&[("target", DataValue::from(".commands"))]));
        assert_eq!(
            expanded.to_text(),
            "{show={operation=info, variables={target=.commands}}, tags=[default, fixed]}"
        );
    }

    #[test]
    fn keys_are_substituted_and_expansions_are_independent() {
        let template = template();
        let first = template.expand(&entries(&[("name", DataValue::from("a"))]));
        let second = template.expand(&entries(&[("name", DataValue::from("b"))]));
        assert!(first.to_text().starts_with("{a="));
        assert!(second.to_text().starts_with("{b="));
        assert!(!first.same_instance(&second));
    }
}
