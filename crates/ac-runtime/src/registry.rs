use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ac_convert::{ConversionEngine, SuperTypeConverter};
use ac_core::{
    downcast_object, AdminError, AdminResult, DataHolder, DataKey, DataObject, DataValue,
    ValueType, REGISTRY_TYPE,
};
use indexmap::IndexMap;
use tracing::debug;

use crate::datapath::{DataPath, PathReference, PathResolver};

/// Where a registered object lives: its registry and its key there.
#[derive(Clone)]
pub struct Registration {
    registry: Weak<Registry>,
    key: String,
}

impl Registration {
    pub fn registry(&self) -> Option<Rc<Registry>> {
        self.registry.upgrade()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> AdminResult<DataPath> {
        let registry = self.registry().ok_or_else(|| {
            AdminError::path(
                "PATH_NOT_REGISTERED",
                format!("{} is no longer part of a registry.", self.key),
            )
        })?;
        registry.path_of(&self.key)
    }

    pub fn reference(&self) -> Option<DataValue> {
        self.registry()?.reference_for(&self.key)
    }
}

#[derive(Default)]
pub struct RegistrationSlot(RefCell<Option<Registration>>);

impl RegistrationSlot {
    pub fn get(&self) -> Option<Registration> {
        self.0.borrow().clone()
    }

    fn set(&self, registration: Registration) {
        *self.0.borrow_mut() = Some(registration);
    }

    pub fn reference(&self) -> Option<DataValue> {
        self.get()?.reference()
    }
}

/// Objects that can live in a [`Registry`]. Once registered they hand out
/// live path references to themselves.
pub trait Registrable: DataObject {
    fn registry_key(&self) -> String;

    fn registration(&self) -> &RegistrationSlot;
}

/// Keyed, named collection of registrable values. Registries nest under a
/// single root registry, which is also the root of every data path.
pub struct Registry {
    key: String,
    value_type: String,
    value_description: String,
    plural: String,
    key_type: ValueType,
    entries: RefCell<IndexMap<DataKey, DataValue>>,
    registration: RegistrationSlot,
    conversions: Rc<ConversionEngine>,
    root_resolver: Option<Weak<PathResolver>>,
}

impl Registry {
    pub fn new(
        conversions: Rc<ConversionEngine>,
        key: &str,
        value_type: &str,
        value_description: &str,
        plural: &str,
    ) -> Rc<Self> {
        Rc::new(Self {
            key: key.to_string(),
            value_type: value_type.to_string(),
            value_description: value_description.to_string(),
            plural: plural.to_string(),
            key_type: ValueType::Text,
            entries: RefCell::new(IndexMap::new()),
            registration: RegistrationSlot::default(),
            conversions,
            root_resolver: None,
        })
    }

    /// Creates the root registry and installs it as the root of `resolver`.
    pub fn root(resolver: &Rc<PathResolver>) -> Rc<Self> {
        let conversions = resolver.conversions().clone();
        let root = Rc::new(Self {
            key: "registries".to_string(),
            value_type: REGISTRY_TYPE.to_string(),
            value_description: "Registry".to_string(),
            plural: "Registries".to_string(),
            key_type: ValueType::Text,
            entries: RefCell::new(IndexMap::new()),
            registration: RegistrationSlot::default(),
            conversions: conversions.clone(),
            root_resolver: Some(Rc::downgrade(resolver)),
        });
        resolver.set_root(DataValue::object(root.clone()));
        conversions.register_super_type_converter(Rc::new(RegistryValueConverter::new(&root)));
        root
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value_type(&self) -> &str {
        &self.value_type
    }

    pub fn plural(&self) -> &str {
        &self.plural
    }

    pub fn is_root(&self) -> bool {
        self.root_resolver.is_some()
    }

    pub fn parent(&self) -> Option<Rc<Registry>> {
        self.registration.get()?.registry()
    }

    /// The resolver of the root this registry hangs under.
    pub fn resolver(&self) -> Option<Rc<PathResolver>> {
        match &self.root_resolver {
            Some(resolver) => resolver.upgrade(),
            None => self.parent()?.resolver(),
        }
    }

    /// Registers `object` under its own key. Registering a key twice is
    /// refused. Registries registered into the root also become a conversion
    /// source for their value type.
    pub fn register<T: Registrable>(self: &Rc<Self>, object: Rc<T>) -> bool {
        let key = object.registry_key();
        let map_key = DataKey::text(key.clone());
        if self.entries.borrow().contains_key(&map_key) {
            debug!(registry = %self.key, key = %key, "refused duplicate registration");
            return false;
        }
        object.registration().set(Registration {
            registry: Rc::downgrade(self),
            key: key.clone(),
        });
        let value = DataValue::object(object.clone());
        if self.is_root() {
            if let Ok(child) = object.into_any().downcast::<Registry>() {
                self.conversions
                    .register_super_type_converter(Rc::new(RegistryValueConverter::new(&child)));
                self.conversions.mark_referencable(&child.value_type);
            }
        }
        self.entries.borrow_mut().insert(map_key, value);
        debug!(registry = %self.key, key = %key, "registered value");
        true
    }

    pub fn unregister(&self, key: &str) -> Option<DataValue> {
        let removed = self.entries.borrow_mut().shift_remove(&DataKey::text(key))?;
        if self.is_root() {
            if let Some(child) = removed.as_object().and_then(downcast_object::<Registry>) {
                self.conversions
                    .unregister_super_type_converter(&child.value_type);
            }
        }
        Some(removed)
    }

    /// Removes every entry whose value is `value` itself.
    pub fn unregister_by_value(&self, value: &DataValue) -> bool {
        match self.get_key_for(value) {
            Some(key) => self.unregister(&key).is_some(),
            None => false,
        }
    }

    pub fn clear(&self) {
        for key in self.keys() {
            self.unregister(&key);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(&DataKey::text(key))
    }

    pub fn is_registered(&self, value: &DataValue) -> bool {
        self.get_key_for(value).is_some()
    }

    pub fn get_key_for(&self, value: &DataValue) -> Option<String> {
        self.entries
            .borrow()
            .iter()
            .find(|(_, registered)| registered.same_instance(value))
            .map(|(key, _)| key.to_text())
    }

    pub fn get_all(&self) -> Vec<DataValue> {
        self.values()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().map(DataKey::to_text).collect()
    }

    pub fn values(&self) -> Vec<DataValue> {
        self.entries.borrow().values().cloned().collect()
    }

    pub fn get_by_key(&self, key: &DataKey) -> Option<DataValue> {
        self.entries.borrow().get(key).cloned()
    }

    /// Case-insensitive match on the value descriptions, spaces and
    /// underscores being interchangeable.
    pub fn get_by_description(&self, description: &str) -> Option<(DataKey, DataValue)> {
        let wanted = description.replace(' ', "_");
        self.entries
            .borrow()
            .iter()
            .find(|(_, value)| value.describe().replace(' ', "_").eq_ignore_ascii_case(&wanted))
            .map(|(key, value)| (key.clone(), value.clone()))
    }

    pub fn get_object<T: DataObject>(&self, name: &str) -> Option<Rc<T>> {
        let value = self.get_value(&DataValue::from(name))?;
        downcast_object::<T>(value.as_object()?)
    }

    /// Path of the value registered under `key`, built by walking up to the
    /// root registry.
    pub fn path_of(&self, key: &str) -> AdminResult<DataPath> {
        if !self.contains(key) {
            return Err(AdminError::path(
                "PATH_NOT_REGISTERED",
                format!("{} is not registered in {}.", key, self.plural),
            ));
        }
        let mut segments = vec![key.to_string()];
        if !self.is_root() {
            segments.push(self.key.clone());
            let mut current = self.parent();
            loop {
                let Some(registry) = current else {
                    return Err(AdminError::path(
                        "PATH_NO_ROOT",
                        format!("{} does not lead to a root registry.", self.plural),
                    ));
                };
                if registry.is_root() {
                    break;
                }
                segments.push(registry.key.clone());
                current = registry.parent();
            }
        }
        segments.reverse();
        Ok(DataPath::from_segments(segments))
    }

    pub fn reference_for(&self, key: &str) -> Option<DataValue> {
        let resolver = self.resolver()?;
        let path = self.path_of(key).ok()?;
        Some(DataValue::object(Rc::new(PathReference::new(path, &resolver))))
    }
}

impl DataHolder for Registry {
    fn get_value(&self, key: &DataValue) -> Option<DataValue> {
        let by_key = self
            .conversions
            .try_convert(key, &self.key_type)
            .and_then(|converted| DataKey::from_value(&converted))
            .and_then(|converted| self.get_by_key(&converted));
        by_key
            .or_else(|| {
                self.get_by_description(&key.to_text())
                    .map(|(_, value)| value)
            })
            .and_then(|value| value.dereferenced())
    }

    fn convert_key(&self, text: &str) -> Option<DataValue> {
        if self.contains(text) {
            return Some(DataValue::from(text));
        }
        self.get_by_description(text)
            .map(|(key, _)| key.to_value())
    }

    fn contents(&self) -> IndexMap<String, DataValue> {
        self.entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.to_text(), value.clone()))
            .collect()
    }

    fn value_description(&self) -> String {
        self.value_description.clone()
    }
}

impl DataObject for Registry {
    fn type_name(&self) -> &str {
        REGISTRY_TYPE
    }

    fn type_description(&self) -> String {
        "Registry".to_string()
    }

    fn describe(&self) -> String {
        self.plural.clone()
    }

    fn as_holder(&self) -> Option<&dyn DataHolder> {
        Some(self)
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

impl Registrable for Registry {
    fn registry_key(&self) -> String {
        self.key.clone()
    }

    fn registration(&self) -> &RegistrationSlot {
        &self.registration
    }
}

/// Converts keys, descriptions and paths into values of one registry.
struct RegistryValueConverter {
    registry: Weak<Registry>,
    family: String,
}

impl RegistryValueConverter {
    fn new(registry: &Rc<Registry>) -> Self {
        Self {
            registry: Rc::downgrade(registry),
            family: registry.value_type.clone(),
        }
    }
}

impl SuperTypeConverter for RegistryValueConverter {
    fn family(&self) -> &str {
        &self.family
    }

    fn convert(
        &self,
        engine: &ConversionEngine,
        input: &DataValue,
        requested: &ValueType,
    ) -> AdminResult<DataValue> {
        let registry = self.registry.upgrade().ok_or_else(|| {
            AdminError::conversion(
                "CONVERT_REGISTRY_GONE",
                format!("The {} registry is no longer available.", self.family),
            )
        })?;
        if let Some(found) = registry.get_value(input) {
            if engine.satisfies(&found, requested) {
                return Ok(found);
            }
        }
        let not_found = || {
            AdminError::conversion(
                "CONVERT_NOT_REGISTERED",
                format!(
                    "Did not find any {} called: {}",
                    registry.value_description,
                    input.to_text()
                ),
            )
        };
        let (Some(text), Some(resolver)) = (input.as_text(), registry.resolver()) else {
            return Err(not_found());
        };
        let resolved = if text.starts_with('.') {
            resolver.resolve_from_root(text)
        } else {
            resolver.resolve(&DataValue::object(registry.clone()), text)
        };
        match resolved {
            Ok(value) if engine.satisfies(&value, requested) => Ok(value),
            _ => Err(not_found()),
        }
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;

    struct Gadget {
        name: String,
        registration: RegistrationSlot,
    }

    impl Gadget {
        fn new(name: &str) -> Rc<Self> {
            Rc::new(Self {
                name: name.to_string(),
                registration: RegistrationSlot::default(),
            })
        }
    }

    impl DataObject for Gadget {
        fn type_name(&self) -> &str {
            "gadget"
        }

        fn describe(&self) -> String {
            self.name.replace('-', " ")
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

    impl Registrable for Gadget {
        fn registry_key(&self) -> String {
            self.name.clone()
        }

        fn registration(&self) -> &RegistrationSlot {
            &self.registration
        }
    }

    fn setup() -> (Rc<PathResolver>, Rc<Registry>, Rc<Registry>) {
        let conversions = Rc::new(ConversionEngine::new());
        let resolver = PathResolver::new(conversions.clone());
        let root = Registry::root(&resolver);
        let gadgets = Registry::new(conversions, "gadgets", "gadget", "Gadget", "Gadgets");
        assert!(root.register(gadgets.clone()));
        (resolver, root, gadgets)
    }

    #[test]
    fn duplicate_keys_are_refused() {
        let (_resolver, _root, gadgets) = setup();
        assert!(gadgets.register(Gadget::new("big-one")));
        assert!(!gadgets.register(Gadget::new("big-one")));
        assert_eq!(gadgets.len(), 1);
        assert_eq!(gadgets.parent().expect("parent").key(), "registries");
    }

    #[test]
    fn values_unregister_by_identity() {
        let (_resolver, _root, gadgets) = setup();
        let first = Gadget::new("first");
        gadgets.register(first.clone());
        gadgets.register(Gadget::new("second"));
        let value = DataValue::object(first);
        assert!(gadgets.is_registered(&value));
        assert_eq!(gadgets.get_key_for(&value), Some("first".to_string()));
        assert!(gadgets.unregister_by_value(&value));
        assert!(!gadgets.unregister_by_value(&value));
        assert_eq!(gadgets.get_all().len(), 1);
        gadgets.clear();
        assert!(gadgets.is_empty());
    }

    #[test]
    fn lookup_falls_back_to_descriptions() {
        let (_resolver, _root, gadgets) = setup();
        gadgets.register(Gadget::new("big-one"));
        assert!(gadgets.get_value(&DataValue::from("big-one")).is_some());
        assert!(gadgets.get_value(&DataValue::from("BIG_ONE")).is_some());
        assert!(gadgets.get_value(&DataValue::from("Big One")).is_some());
        assert_eq!(
            gadgets.convert_key("big one"),
            Some(DataValue::from("big-one"))
        );
        assert!(gadgets.get_object::<Gadget>("big-one").is_some());
        assert!(gadgets.get_object::<Registry>("big-one").is_none());
    }

    #[test]
    fn registered_values_hand_out_live_references() {
        let (resolver, root, gadgets) = setup();
        let gadget = Gadget::new("tool");
        gadgets.register(gadget.clone());
        assert_eq!(
            gadgets.path_of("tool").expect("path").full_path(),
            ".gadgets.tool"
        );
        assert_eq!(root.path_of("gadgets").expect("path").full_path(), ".gadgets");

        let reference = gadget.reference().expect("reference");
        assert_eq!(reference.type_key(), ac_core::REFERENCE_TYPE);
        assert_eq!(reference.describe(), "tool");
        assert!(resolver.resolve_from_root(".gadgets.tool").is_ok());

        gadgets.unregister("tool");
        assert_eq!(reference.dereferenced(), None);
    }

    #[test]
    fn registry_values_convert_from_keys_and_paths() {
        let (resolver, root, gadgets) = setup();
        gadgets.register(Gadget::new("tool"));
        let engine = resolver.conversions().clone();
        let gadget_type = ValueType::named("gadget");

        let by_key = engine
            .convert(&DataValue::from("tool"), &gadget_type)
            .expect("by key");
        assert_eq!(by_key.type_key(), "gadget");
        assert!(engine
            .convert(&DataValue::from(".gadgets.tool"), &gadget_type)
            .is_ok());
        let missing = engine
            .convert(&DataValue::from("hammer"), &gadget_type)
            .expect_err("missing");
        assert_eq!(missing.code, "CONVERT_NOT_REGISTERED");
        assert_eq!(missing.message, "Did not find any Gadget called: hammer");

        let registry = engine
            .convert(&DataValue::from("gadgets"), &ValueType::named(REGISTRY_TYPE))
            .expect("registry");
        assert_eq!(registry.describe(), "Gadgets");

        root.unregister("gadgets");
        assert!(!engine.has_super_type_converter("gadget"));
    }

    #[test]
    fn registries_describe_themselves_as_holders() {
        let (_resolver, root, gadgets) = setup();
        gadgets.register(Gadget::new("a"));
        let value = DataValue::object(gadgets.clone());
        assert_eq!(value.type_and_value_description(), "Registry: Gadgets");
        assert_eq!(gadgets.contents().keys().cloned().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(root.keys(), vec!["gadgets"]);
        assert_eq!(gadgets.value_description(), "Gadget");
    }
}
