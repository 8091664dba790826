use ac_core::text::split_on_spaces;
use ac_core::DataValue;
use tracing::trace;

use crate::datapath::PathResolver;
use crate::storage::Storage;

const VARIABLE_NOT_FOUND: &str = "<variable not found>";

/// A named input of an operation template with an optional declared value.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    value: Option<DataValue>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: Option<DataValue>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn declared(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&DataValue> {
        self.value.as_ref()
    }

    /// Binds this variable into `storage`, the scope of a starting operation.
    ///
    /// A value already present in `parent` under the same name wins. Text
    /// values are then interpreted: `$name` copies a variable from the local
    /// or parent scope, `path.$name` resolves `path` starting at the parent's
    /// variable, text with other `$` tokens is interpolated word by word and
    /// `.path` resolves from the data root. Anything else is stored as is.
    pub fn map_into(&self, parent: &Storage, storage: &Storage, resolver: &PathResolver) {
        if let Some(inherited) = parent.get(&self.name) {
            storage.set(&self.name, inherited);
            return;
        }
        let Some(value) = &self.value else {
            return;
        };
        let Some(text) = value.as_text() else {
            storage.set(&self.name, value.clone());
            return;
        };

        if let Some(variable) = text.strip_prefix('$') {
            if let Some(found) = lookup(variable, parent, storage) {
                storage.set(&self.name, found);
            }
            return;
        }

        if !text.starts_with('.') && !text.contains(char::is_whitespace) {
            if let Some((path, variable)) = text.split_once(".$") {
                if let Some(start) = parent.get(variable) {
                    match resolver.resolve(&start, path) {
                        Ok(found) => storage.set(&self.name, found),
                        Err(error) => trace!(
                            variable = %self.name,
                            code = %error.code,
                            "variable path did not resolve"
                        ),
                    }
                }
                return;
            }
        }

        if text.contains('$') {
            let interpolated = split_on_spaces(text)
                .iter()
                .map(|word| match word.strip_prefix('$') {
                    Some(variable) => lookup(variable, parent, storage)
                        .map(|found| found.to_text())
                        .unwrap_or_else(|| VARIABLE_NOT_FOUND.to_string()),
                    None => word.clone(),
                })
                .collect::<Vec<_>>()
                .join(" ");
            storage.set(&self.name, DataValue::Text(interpolated));
            return;
        }

        if text.starts_with('.') {
            match resolver.resolve_from_root(text) {
                Ok(found) => storage.set(&self.name, found),
                Err(error) => trace!(
                    variable = %self.name,
                    code = %error.code,
                    "variable path did not resolve"
                ),
            }
            return;
        }

        storage.set(&self.name, value.clone());
    }
}

fn lookup(name: &str, parent: &Storage, storage: &Storage) -> Option<DataValue> {
    storage.get(name).or_else(|| parent.get(name))
}

#[cfg(test)]
mod variable_tests {
    use super::*;
    use std::rc::Rc;

    use ac_convert::ConversionEngine;
    use indexmap::IndexMap;

    fn scopes() -> (Rc<PathResolver>, Storage, Storage) {
        let conversions = Rc::new(ConversionEngine::new());
        let resolver = PathResolver::new(conversions.clone());
        let root: IndexMap<String, DataValue> = [(
            "config".to_string(),
            DataValue::text_map(
                [("port".to_string(), DataValue::Integer(8080))]
                    .into_iter()
                    .collect(),
            ),
        )]
        .into_iter()
        .collect();
        resolver.set_root(DataValue::text_map(root));
        let parent = Storage::new(conversions.clone());
        let local = Storage::new(conversions);
        (resolver, parent, local)
    }

    #[test]
    fn parent_values_take_precedence() {
        let (resolver, parent, local) = scopes();
        parent.set("target", DataValue::from("from-parent"));
        Variable::new("target", Some(DataValue::from("declared"))).map_into(&parent, &local, &resolver);
        assert_eq!(local.get("target"), Some(DataValue::from("from-parent")));
    }

    #[test]
    fn dollar_names_copy_other_variables() {
        let (resolver, parent, local) = scopes();
        parent.set("user", DataValue::from("alice"));
        local.set("age", DataValue::Integer(3));
        Variable::new("who", Some(DataValue::from("$user"))).map_into(&parent, &local, &resolver);
        Variable::new("years", Some(DataValue::from("$age"))).map_into(&parent, &local, &resolver);
        Variable::new("gone", Some(DataValue::from("$nobody"))).map_into(&parent, &local, &resolver);
        assert_eq!(local.get("who"), Some(DataValue::from("alice")));
        assert_eq!(local.get("years"), Some(DataValue::Integer(3)));
        assert!(!local.is_set("gone"));
    }

    #[test]
    fn text_is_interpolated_word_by_word() {
        let (resolver, parent, local) = scopes();
        parent.set("name", DataValue::from("bob"));
        Variable::new(
            "greeting",
            Some(DataValue::from("hello  $name and $stranger")),
        )
        .map_into(&parent, &local, &resolver);
        assert_eq!(
            local.get("greeting"),
            Some(DataValue::from("hello bob and <variable not found>"))
        );
    }

    #[test]
    fn paths_resolve_from_root_or_variable() {
        let (resolver, parent, local) = scopes();
        Variable::new("port", Some(DataValue::from(".config.port"))).map_into(&parent, &local, &resolver);
        assert_eq!(local.get("port"), Some(DataValue::Integer(8080)));

        Variable::new("broken", Some(DataValue::from(".config.nothing"))).map_into(&parent, &local, &resolver);
        assert!(!local.is_set("broken"));

        parent.set(
            "settings",
            DataValue::text_map(
                [("host".to_string(), DataValue::from("localhost"))]
                    .into_iter()
                    .collect(),
            ),
        );
        Variable::new("host", Some(DataValue::from("host.$settings"))).map_into(&parent, &local, &resolver);
        assert_eq!(local.get("host"), Some(DataValue::from("localhost")));
    }

    #[test]
    fn literals_and_undeclared_values() {
        let (resolver, parent, local) = scopes();
        Variable::new("limit", Some(DataValue::Integer(5))).map_into(&parent, &local, &resolver);
        Variable::new("mode", Some(DataValue::from("strict"))).map_into(&parent, &local, &resolver);
        Variable::declared("absent").map_into(&parent, &local, &resolver);
        assert_eq!(local.get("limit"), Some(DataValue::Integer(5)));
        assert_eq!(local.get("mode"), Some(DataValue::from("strict")));
        assert!(!local.is_set("absent"));
    }
}
