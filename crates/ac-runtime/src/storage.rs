use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ac_convert::ConversionEngine;
use ac_core::text::split_on_periods;
use ac_core::{
    downcast_object, AdminError, AdminResult, DataHolder, DataKey, DataObject, DataValue,
    ValueType, STORAGE_TYPE,
};
use indexmap::IndexMap;
use rust_decimal::Decimal;

/// One level of hierarchical key/value storage. Handles are cheap clones of
/// a shared node.
#[derive(Clone)]
pub struct Storage(Rc<StorageNode>);

pub struct StorageNode {
    name: String,
    entries: RefCell<IndexMap<String, DataValue>>,
    parent: Option<Weak<StorageNode>>,
    conversions: Rc<ConversionEngine>,
}

impl Storage {
    pub fn new(conversions: Rc<ConversionEngine>) -> Self {
        Self::named(conversions, "")
    }

    pub fn named(conversions: Rc<ConversionEngine>, name: &str) -> Self {
        Self(Rc::new(StorageNode {
            name: name.to_string(),
            entries: RefCell::new(IndexMap::new()),
            parent: None,
            conversions,
        }))
    }

    /// Storage pre-filled from a map value; keys become text.
    pub fn from_value(conversions: Rc<ConversionEngine>, name: &str, value: &DataValue) -> Self {
        let storage = Self::named(conversions, name);
        storage.set_all_from(value);
        storage
    }

    pub fn from_object(object: &Rc<dyn DataObject>) -> Option<Self> {
        downcast_object::<StorageNode>(object).map(Self)
    }

    fn child(&self, name: &str) -> Self {
        Self(Rc::new(StorageNode {
            name: name.to_string(),
            entries: RefCell::new(IndexMap::new()),
            parent: Some(Rc::downgrade(&self.0)),
            conversions: self.0.conversions.clone(),
        }))
    }

    pub fn conversions(&self) -> &Rc<ConversionEngine> {
        &self.0.conversions
    }

    pub fn as_value(&self) -> DataValue {
        DataValue::Object(self.0.clone())
    }

    pub fn storage_key(&self) -> &str {
        &self.0.name
    }

    /// Dotted path of this node below its top-level storage.
    pub fn storage_path(&self) -> String {
        let mut names = Vec::new();
        let mut current = Some(self.0.clone());
        while let Some(node) = current {
            let parent = node.parent.as_ref().and_then(Weak::upgrade);
            if parent.is_some() || !node.name.is_empty() {
                names.push(node.name.clone());
            }
            current = parent;
        }
        names.reverse();
        names.join(".")
    }

    fn located(&self, key: &str) -> String {
        let path = self.storage_path();
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", path, key)
        }
    }

    /// Walks to the node owning the last segment of `key`.
    fn locate(&self, key: &str, create: bool) -> Option<(Storage, String)> {
        let mut segments = split_on_periods(key);
        let last = segments.pop()?;
        let mut node = self.clone();
        for segment in segments {
            node = node.get_storage(&segment, create)?;
        }
        Some((node, last))
    }

    fn raw(&self, key: &str) -> Option<DataValue> {
        let (node, last) = self.locate(key, false)?;
        let value = node.0.entries.borrow().get(&last).cloned();
        value
    }

    /// Value at `key`, following references.
    pub fn get(&self, key: &str) -> Option<DataValue> {
        self.raw(key)?.dereferenced()
    }

    /// Stores `value` at `key`, creating intermediate nodes. Registered
    /// objects are stored as live references.
    pub fn set(&self, key: &str, value: DataValue) {
        let Some((node, last)) = self.locate(key, true) else {
            return;
        };
        let value = value
            .as_object()
            .and_then(|object| object.reference())
            .unwrap_or(value);
        node.0.entries.borrow_mut().insert(last, value);
    }

    pub fn unset(&self, key: &str) -> Option<DataValue> {
        let (node, last) = self.locate(key, false)?;
        let removed = node.0.entries.borrow_mut().shift_remove(&last);
        removed
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Copies every entry of a map value, keys converted to text.
    pub fn set_all_from(&self, value: &DataValue) {
        if let Some(map) = value.as_map() {
            let entries: Vec<(DataKey, DataValue)> = map
                .borrow()
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            for (key, value) in entries {
                self.0.entries.borrow_mut().insert(key.to_text(), value);
            }
        } else if let Some(holder) = value.as_holder() {
            self.set_all(holder.contents());
        }
    }

    pub fn set_all(&self, entries: IndexMap<String, DataValue>) {
        self.0.entries.borrow_mut().extend(entries);
    }

    /// Value at `key` converted to `ty`. Successful conversions replace the
    /// stored value so repeated reads return the same instance.
    pub fn get_as(&self, key: &str, ty: &ValueType) -> Option<DataValue> {
        if ty.is_collection() {
            return self.get_collection(key, ty, false);
        }
        if ty.is_map() {
            return self.get_map(key, ty, false);
        }
        if ty == &ValueType::named(STORAGE_TYPE) {
            return self.get_storage(key, false).map(|storage| storage.as_value());
        }
        let raw = self.get(key)?;
        let converted = self.0.conversions.convert(&raw, ty).ok()?;
        if raw.as_object().is_none() && converted != raw {
            self.set(key, converted.clone());
        }
        Some(converted)
    }

    pub fn get_or(&self, key: &str, ty: &ValueType, default: DataValue) -> DataValue {
        self.get_as(key, ty).unwrap_or(default)
    }

    pub fn get_text(&self, key: &str) -> Option<String> {
        self.get_as(key, &ValueType::Text)
            .and_then(|value| value.as_text().map(ToString::to_string))
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_as(key, &ValueType::Bool)?.as_bool()
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_as(key, &ValueType::Long)?.as_i64()
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get_as(key, &ValueType::Double)?.as_f64()
    }

    pub fn get_decimal(&self, key: &str) -> Option<Decimal> {
        self.get_as(key, &ValueType::Decimal)?.as_decimal()
    }

    pub fn get_collection(
        &self,
        key: &str,
        ty: &ValueType,
        empty_if_null: bool,
    ) -> Option<DataValue> {
        let raw = self.get(key);
        let converted = self
            .0
            .conversions
            .convert_to_collection(raw.as_ref(), ty, empty_if_null)?;
        if !raw.is_some_and(|raw| raw.same_instance(&converted)) {
            self.set(key, converted.clone());
        }
        Some(converted)
    }

    pub fn get_map(&self, key: &str, ty: &ValueType, empty_if_null: bool) -> Option<DataValue> {
        let raw = self.get(key);
        let converted = self
            .0
            .conversions
            .convert_to_map(raw.as_ref(), ty, empty_if_null)?;
        if !raw.is_some_and(|raw| raw.same_instance(&converted)) {
            self.set(key, converted.clone());
        }
        Some(converted)
    }

    pub fn assert_set(&self, key: &str) -> AdminResult<()> {
        if self.is_set(key) {
            return Ok(());
        }
        Err(AdminError::invalid_input(
            "INPUT_MISSING",
            format!("Missing value at: '{}'", self.located(key)),
        ))
    }

    pub fn get_and_assert(&self, key: &str, ty: &ValueType) -> AdminResult<DataValue> {
        if let Some(value) = self.get_as(key, ty) {
            return Ok(value);
        }
        self.assert_set(key)?;
        Err(AdminError::invalid_input(
            "INPUT_UNCONVERTIBLE",
            format!(
                "{} at: '{}' could not be converted to type: {}",
                self.describe_raw(key),
                self.located(key),
                ty
            ),
        ))
    }

    pub fn get_and_assert_text(&self, key: &str) -> AdminResult<String> {
        let value = self.get_and_assert(key, &ValueType::Text)?;
        Ok(value.to_text())
    }

    pub fn get_and_assert_collection(
        &self,
        key: &str,
        ty: &ValueType,
        min_size: usize,
    ) -> AdminResult<DataValue> {
        let element_type = ty
            .element_type()
            .map(ToString::to_string)
            .unwrap_or_default();
        if let Some(collection) = self.get_collection(key, ty, false) {
            let size = collection.len().unwrap_or(0);
            if size >= min_size {
                return Ok(collection);
            }
            return Err(AdminError::invalid_input(
                "INPUT_TOO_SMALL",
                format!(
                    "Collection at: '{}' must have a minimum of {} elements of type {}. It has: {}",
                    self.located(key),
                    min_size,
                    element_type,
                    size
                ),
            ));
        }
        self.assert_set(key)?;
        Err(AdminError::invalid_input(
            "INPUT_UNCONVERTIBLE",
            format!(
                "{} at: '{}' could not be converted to a {} with elements of type: {}",
                self.describe_raw(key),
                self.located(key),
                collection_kind(ty),
                element_type
            ),
        ))
    }

    pub fn get_and_assert_map(
        &self,
        key: &str,
        ty: &ValueType,
        min_size: usize,
    ) -> AdminResult<DataValue> {
        let (key_type, value_type) = ty
            .key_value_types()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .unwrap_or_default();
        if let Some(map) = self.get_map(key, ty, false) {
            let size = map.len().unwrap_or(0);
            if size >= min_size {
                return Ok(map);
            }
            return Err(AdminError::invalid_input(
                "INPUT_TOO_SMALL",
                format!(
                    "Map at: '{}' must have a minimum of {} entries with key type: {} and value type: {}. It has: {}",
                    self.located(key),
                    min_size,
                    key_type,
                    value_type,
                    size
                ),
            ));
        }
        self.assert_set(key)?;
        Err(AdminError::invalid_input(
            "INPUT_UNCONVERTIBLE",
            format!(
                "{} at: '{}' could not be converted to a map with key type: {}, and value type: {}",
                self.describe_raw(key),
                self.located(key),
                key_type,
                value_type
            ),
        ))
    }

    fn describe_raw(&self, key: &str) -> String {
        self.get(key)
            .map(|value| value.type_and_value_description())
            .unwrap_or_default()
    }

    /// Child node at `key`. An existing node is reused; a stored map is
    /// replaced by a node holding its entries; otherwise a fresh node is
    /// created when `create` is set.
    pub fn get_storage(&self, key: &str, create: bool) -> Option<Storage> {
        if key.contains('.') {
            let (node, last) = self.locate(key, create)?;
            return node.get_storage(&last, create);
        }
        let existing = self.0.entries.borrow().get(key).cloned();
        if let Some(existing) = &existing {
            if let Some(storage) = existing.as_object().and_then(Storage::from_object) {
                return Some(storage);
            }
            if existing.as_map().is_some() {
                let storage = self.child(key);
                storage.set_all_from(existing);
                self.insert_node(key, &storage);
                return Some(storage);
            }
        }
        if !create {
            return None;
        }
        let storage = self.child(key);
        self.insert_node(key, &storage);
        Some(storage)
    }

    fn insert_node(&self, key: &str, storage: &Storage) {
        self.0
            .entries
            .borrow_mut()
            .insert(key.to_string(), storage.as_value());
    }

    pub fn get_and_assert_storage(&self, key: &str) -> AdminResult<Storage> {
        if let Some(storage) = self.get_storage(key, false) {
            return Ok(storage);
        }
        self.assert_set(key)?;
        Err(AdminError::invalid_input(
            "INPUT_UNCONVERTIBLE",
            format!(
                "{} at: '{}' could not be converted to type: {}",
                self.describe_raw(key),
                self.located(key),
                STORAGE_TYPE
            ),
        ))
    }

    pub fn is_storage(&self, key: &str) -> bool {
        self.raw(key).is_some_and(|value| {
            value.as_map().is_some()
                || value
                    .as_object()
                    .and_then(Storage::from_object)
                    .is_some()
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.entries.borrow().keys().cloned().collect()
    }

    /// Child nodes, materializing stored maps.
    pub fn nodes(&self) -> Vec<Storage> {
        self.keys()
            .iter()
            .filter(|key| self.is_storage(key))
            .filter_map(|key| self.get_storage(key, false))
            .collect()
    }

    pub fn contents(&self) -> IndexMap<String, DataValue> {
        self.0.entries.borrow().clone()
    }

    /// Deep copy as a plain map value, nested nodes included.
    pub fn to_map_value(&self) -> DataValue {
        let entries = self
            .contents()
            .into_iter()
            .map(|(key, value)| {
                let value = match value.as_object().and_then(Storage::from_object) {
                    Some(storage) => storage.to_map_value(),
                    None => value,
                };
                (key, value)
            })
            .collect();
        DataValue::text_map(entries)
    }

    /// Indented `key: value` listing, three spaces per nesting level.
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        self.describe_into(0, &mut lines);
        lines.join("\n")
    }

    fn describe_into(&self, depth: usize, lines: &mut Vec<String>) {
        let indent = "   ".repeat(depth);
        for (key, value) in self.contents() {
            match value.as_object().and_then(Storage::from_object) {
                Some(storage) => {
                    lines.push(format!("{}{}:", indent, key));
                    storage.describe_into(depth + 1, lines);
                }
                None => lines.push(format!("{}{}: {}", indent, key, value.describe())),
            }
        }
    }
}

fn collection_kind(ty: &ValueType) -> &'static str {
    match ty {
        ValueType::List(_) => "list",
        ValueType::Set(_) => "set",
        _ => "collection",
    }
}

impl DataHolder for StorageNode {
    fn get_value(&self, key: &DataValue) -> Option<DataValue> {
        let key = key.to_text();
        let value = self.entries.borrow().get(&key).cloned();
        value?.dereferenced()
    }

    fn convert_key(&self, text: &str) -> Option<DataValue> {
        Some(DataValue::from(text))
    }

    fn contents(&self) -> IndexMap<String, DataValue> {
        self.entries.borrow().clone()
    }
}

impl DataObject for StorageNode {
    fn type_name(&self) -> &str {
        STORAGE_TYPE
    }

    fn type_description(&self) -> String {
        "Memory Storage".to_string()
    }

    fn describe(&self) -> String {
        if self.name.is_empty() {
            "storage".to_string()
        } else {
            self.name.clone()
        }
    }

    fn as_holder(&self) -> Option<&dyn DataHolder> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

#[cfg(test)]
mod storage_tests {
    use super::*;

    fn storage() -> Storage {
        Storage::new(Rc::new(ConversionEngine::new()))
    }

    #[test]
    fn dotted_keys_create_nested_nodes() {
        let storage = storage();
        storage.set("a.b.c", DataValue::from("deep"));
        assert_eq!(storage.get("a.b.c"), Some(DataValue::from("deep")));
        assert!(storage.is_storage("a"));
        let inner = storage.get_storage("a.b", false).expect("node");
        assert_eq!(inner.storage_path(), "a.b");
        assert_eq!(inner.get("c"), Some(DataValue::from("deep")));
        assert_eq!(storage.unset("a.b.c"), Some(DataValue::from("deep")));
        assert!(!storage.is_set("a.b.c"));
    }

    #[test]
    fn conversions_are_written_back() {
        let storage = storage();
        storage.set("count", DataValue::from("42"));
        assert_eq!(
            storage.get_as("count", &ValueType::Int),
            Some(DataValue::Integer(42))
        );
        assert_eq!(storage.get("count"), Some(DataValue::Integer(42)));
        assert_eq!(storage.get_i64("count"), Some(42));
        assert_eq!(storage.get_as("missing", &ValueType::Int), None);
        assert_eq!(
            storage.get_or("missing", &ValueType::Bool, DataValue::Bool(true)),
            DataValue::Bool(true)
        );
    }

    #[test]
    fn collection_reads_are_idempotent() {
        let storage = storage();
        storage.set("names", DataValue::from("a b c"));
        let ty = ValueType::list(ValueType::Text);
        let first = storage.get_as("names", &ty).expect("first");
        let second = storage.get_as("names", &ty).expect("second");
        assert!(first.same_instance(&second));
        assert_eq!(first.len(), Some(3));
    }

    #[test]
    fn assertions_report_locations() {
        let storage = storage();
        let node = storage.get_storage("settings", true).expect("node");
        node.set("port", DataValue::from("abc"));

        let missing = node.assert_set("host").expect_err("missing");
        assert_eq!(missing.code, "INPUT_MISSING");
        assert_eq!(missing.message, "Missing value at: 'settings.host'");

        let wrong = node
            .get_and_assert("port", &ValueType::Int)
            .expect_err("unconvertible");
        assert_eq!(
            wrong.message,
            "Text: abc at: 'settings.port' could not be converted to type: int"
        );

        node.set("tags", DataValue::from("one"));
        let small = node
            .get_and_assert_collection("tags", &ValueType::list(ValueType::Text), 2)
            .expect_err("too small");
        assert_eq!(small.code, "INPUT_TOO_SMALL");
        assert_eq!(
            small.message,
            "Collection at: 'settings.tags' must have a minimum of 2 elements of type string. It has: 1"
        );
    }

    #[test]
    fn maps_become_storage_nodes() {
        let storage = storage();
        let entries: IndexMap<String, DataValue> = [
            ("x".to_string(), DataValue::Integer(1)),
            ("y".to_string(), DataValue::Integer(2)),
        ]
        .into_iter()
        .collect();
        storage.set("point", DataValue::text_map(entries));
        assert!(storage.is_storage("point"));
        let node = storage.get_storage("point", false).expect("materialized");
        assert_eq!(node.keys(), vec!["x", "y"]);
        assert_eq!(storage.nodes().len(), 1);
        assert!(storage
            .get_storage("point", false)
            .expect("same node")
            .as_value()
            .same_instance(&node.as_value()));
        assert!(storage.get_storage("absent", false).is_none());
    }

    #[test]
    fn typed_map_assertions() {
        let storage = storage();
        storage.set("limits", DataValue::from("a=1, b=2"));
        let ty = ValueType::map(ValueType::Text, ValueType::Int);
        let map = storage.get_and_assert_map("limits", &ty, 1).expect("map");
        assert_eq!(map.len(), Some(2));
        let error = storage
            .get_and_assert_map("limits", &ty, 3)
            .expect_err("too small");
        assert!(error.message.starts_with("Map at: 'limits' must have a minimum of 3 entries"));
    }

    #[test]
    fn describe_indents_nested_levels() {
        let storage = storage();
        storage.set("name", DataValue::from("root"));
        storage.set("child.value", DataValue::Integer(3));
        assert_eq!(storage.describe(), "name: root\nchild:\n   value: 3");
        let plain = storage.to_map_value();
        assert_eq!(plain.to_text(), "{name=root, child={value=3}}");
    }
}
