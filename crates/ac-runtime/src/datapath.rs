use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use ac_convert::{CacheTag, ConversionEngine, ConversionOverride, Converter};
use ac_core::text::split_on_periods;
use ac_core::{AdminError, AdminResult, DataKey, DataObject, DataValue, ValueType, REFERENCE_TYPE};
use tracing::trace;

/// Resolves one path segment on values of a type the built-in rules do not
/// cover. Keyed by [`DataValue::type_key`].
pub trait CustomPathResolver {
    fn type_key(&self) -> &str;

    /// What the resolver hands out, used in "not found" messages.
    fn resolved_description(&self) -> String;

    fn resolve(
        &self,
        resolver: &PathResolver,
        instance: &DataValue,
        key: &str,
    ) -> AdminResult<Option<DataValue>>;
}

/// Absolute location in the data graph, e.g. `.commands.help`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataPath {
    segments: Vec<String>,
}

impl DataPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(text: &str) -> AdminResult<Self> {
        let trimmed = text.trim();
        if !trimmed.starts_with('.') {
            return Err(AdminError::path(
                "PATH_NOT_ABSOLUTE",
                format!("Invalid path: {}, must start at root.", trimmed),
            ));
        }
        let segments = path_segments(trimmed);
        if segments.is_empty() {
            return Err(AdminError::path(
                "PATH_EMPTY",
                format!("Invalid path: {} contains only root.", trimmed),
            ));
        }
        Ok(Self { segments })
    }

    pub fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.into());
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.segments.split_last()?;
        Some(Self {
            segments: parent.to_vec(),
        })
    }

    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn full_path(&self) -> String {
        self.segments
            .iter()
            .map(|segment| format!(".{}", segment))
            .collect()
    }

    /// Re-resolves the path from the current root. `None` once anything
    /// along the way is gone.
    pub fn value_of(&self, resolver: &PathResolver) -> Option<DataValue> {
        let mut current = resolver.root()?;
        for segment in &self.segments {
            current = resolver.step(&current, segment).ok()?;
        }
        Some(current)
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path())
    }
}

/// Live reference to whatever currently sits at a path.
pub struct PathReference {
    path: DataPath,
    resolver: Weak<PathResolver>,
}

impl PathReference {
    pub fn new(path: DataPath, resolver: &Rc<PathResolver>) -> Self {
        Self {
            path,
            resolver: Rc::downgrade(resolver),
        }
    }

    pub fn path(&self) -> &DataPath {
        &self.path
    }

    pub fn value(&self) -> Option<DataValue> {
        let resolver = self.resolver.upgrade()?;
        self.path.value_of(&resolver)
    }
}

impl DataObject for PathReference {
    fn type_name(&self) -> &str {
        REFERENCE_TYPE
    }

    fn type_description(&self) -> String {
        "Data Reference".to_string()
    }

    fn describe(&self) -> String {
        self.path.full_path()
    }

    fn dereference(&self) -> Option<Option<DataValue>> {
        Some(self.value())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

pub struct PathResolver {
    conversions: Rc<ConversionEngine>,
    root: RefCell<Option<DataValue>>,
    resolvers: RefCell<HashMap<String, Rc<dyn CustomPathResolver>>>,
    path_override: Rc<dyn ConversionOverride>,
}

impl PathResolver {
    /// Also teaches `conversions` to read `.a.b` text as the value at that
    /// path and to turn such text into a [`PathReference`].
    pub fn new(conversions: Rc<ConversionEngine>) -> Rc<Self> {
        let resolver = Rc::new_cyclic(|weak: &Weak<Self>| Self {
            conversions: conversions.clone(),
            root: RefCell::new(None),
            resolvers: RefCell::new(HashMap::new()),
            path_override: Rc::new(DataPathOverride {
                resolver: weak.clone(),
            }),
        });
        conversions.register_override(resolver.path_override.clone());
        conversions.register_converter(Rc::new(DataReferenceConverter {
            resolver: Rc::downgrade(&resolver),
        }));
        resolver
    }

    pub fn conversions(&self) -> &Rc<ConversionEngine> {
        &self.conversions
    }

    pub fn set_root(&self, root: DataValue) {
        *self.root.borrow_mut() = Some(root);
    }

    pub fn root(&self) -> Option<DataValue> {
        self.root.borrow().clone()
    }

    pub fn register_resolver(&self, resolver: Rc<dyn CustomPathResolver>) -> bool {
        let mut resolvers = self.resolvers.borrow_mut();
        let key = resolver.type_key().to_string();
        if resolvers.contains_key(&key) {
            return false;
        }
        resolvers.insert(key, resolver);
        true
    }

    pub fn unregister_resolver(&self, type_key: &str) -> bool {
        self.resolvers.borrow_mut().remove(type_key).is_some()
    }

    pub fn resolve_from_root(&self, path: &str) -> AdminResult<DataValue> {
        let root = self.root().ok_or_else(|| {
            AdminError::path("PATH_NO_ROOT", "No root is available to resolve paths from.")
        })?;
        self.resolve(&root, path)
    }

    pub fn resolve(&self, start: &DataValue, path: &str) -> AdminResult<DataValue> {
        let history = self.resolve_history(start, path)?;
        history.last().cloned().ok_or_else(|| empty_path(path))
    }

    /// Every value visited on the way, starting with `start`.
    pub fn resolve_history(&self, start: &DataValue, path: &str) -> AdminResult<Vec<DataValue>> {
        let segments = path_segments(path);
        if segments.is_empty() {
            return Err(empty_path(path));
        }
        let mut history = vec![start.clone()];
        let mut current = start.clone();
        for segment in &segments {
            current = self.step(&current, segment)?;
            history.push(current.clone());
        }
        trace!(path = %path, steps = segments.len(), "resolved data path");
        Ok(history)
    }

    /// Resolves a single segment on `current`.
    pub fn step(&self, current: &DataValue, key: &str) -> AdminResult<DataValue> {
        let current = current.dereferenced().ok_or_else(|| {
            AdminError::path(
                "PATH_DANGLING_REFERENCE",
                format!("The data before key {} is no longer available.", key),
            )
        })?;

        if let Some(holder) = current.as_holder() {
            let found = holder
                .convert_key(key)
                .and_then(|converted| holder.get_value(&converted))
                .or_else(|| holder.get_value(&DataValue::from(key)));
            return found.and_then(|value| value.dereferenced()).ok_or_else(|| {
                AdminError::path(
                    "PATH_NOT_FOUND",
                    format!(
                        "Did not find anything at key {} in {}",
                        key,
                        current.type_and_value_description()
                    ),
                )
            });
        }

        if let Some(map) = current.as_map() {
            let cached = match self.conversions.cached_tag(&current) {
                Some(CacheTag::Entries(key_type, value_type)) => Some((key_type, value_type)),
                _ => None,
            };
            let map_key = cached
                .as_ref()
                .and_then(|(key_type, _)| {
                    self.conversions
                        .try_convert(&DataValue::from(key), key_type)
                })
                .and_then(|converted| DataKey::from_value(&converted))
                .unwrap_or_else(|| DataKey::text(key));
            let found = map.borrow().get(&map_key).cloned();
            return found.and_then(|value| value.dereferenced()).ok_or_else(|| {
                let message = match &cached {
                    Some((_, value_type)) => {
                        format!("Did not find any {} at key: {}", value_type, key)
                    }
                    None => format!("Did not find anything at key: {}", key),
                };
                AdminError::path("PATH_NOT_FOUND", message)
            });
        }

        if let Some(list) = current.as_list() {
            let index = key.trim().parse::<i64>().map_err(|_| {
                AdminError::path(
                    "PATH_INDEX_INVALID",
                    format!("{} is not a valid index for this list.", key),
                )
            })?;
            let list = list.borrow();
            let found = usize::try_from(index)
                .ok()
                .and_then(|index| list.get(index))
                .cloned();
            return found.and_then(|value| value.dereferenced()).ok_or_else(|| {
                AdminError::path(
                    "PATH_INDEX_OUT_OF_RANGE",
                    format!(
                        "Index {} is outside the scope of this list. (max {})",
                        index,
                        list.len()
                    ),
                )
            });
        }

        let type_key = current.type_key();
        let custom = self.resolvers.borrow().get(&type_key).cloned();
        let Some(custom) = custom else {
            return Err(AdminError::path(
                "PATH_NO_RESOLVER",
                format!(
                    "Could not resolve key: {}. No path resolver registered for type: {}",
                    key, type_key
                ),
            ));
        };
        custom
            .resolve(self, &current, key)?
            .ok_or_else(|| {
                AdminError::path(
                    "PATH_NOT_FOUND",
                    format!(
                        "Did not find any {} at key: {}",
                        custom.resolved_description(),
                        key
                    ),
                )
            })
    }
}

fn path_segments(path: &str) -> Vec<String> {
    let trimmed = path.trim();
    let relative = trimmed.strip_prefix('.').unwrap_or(trimmed);
    split_on_periods(&relative.replace(' ', "_"))
}

fn empty_path(path: &str) -> AdminError {
    AdminError::path(
        "PATH_EMPTY",
        format!("Cannot resolve an empty path: '{}'", path),
    )
}

/// Text starting with `.` converts to whatever the path resolves to, as long
/// as that already satisfies the request. Failures fall through silently.
struct DataPathOverride {
    resolver: Weak<PathResolver>,
}

impl ConversionOverride for DataPathOverride {
    fn convert(
        &self,
        engine: &ConversionEngine,
        input: &DataValue,
        requested: &ValueType,
    ) -> Option<DataValue> {
        let text = input.as_text()?;
        if !text.starts_with('.') {
            return None;
        }
        let resolver = self.resolver.upgrade()?;
        let value = resolver.resolve_from_root(text).ok()?;
        engine.satisfies(&value, requested).then_some(value)
    }
}

struct DataReferenceConverter {
    resolver: Weak<PathResolver>,
}

impl Converter for DataReferenceConverter {
    fn target(&self) -> ValueType {
        ValueType::named(REFERENCE_TYPE)
    }

    fn convert(
        &self,
        _engine: &ConversionEngine,
        input: &DataValue,
        _requested: &ValueType,
    ) -> AdminResult<DataValue> {
        let text = input.to_text();
        let valid = text.starts_with('.')
            && text.chars().nth(1).is_some_and(|second| second != ' ');
        let resolver = self.resolver.upgrade();
        match (valid, resolver) {
            (true, Some(resolver)) => {
                let path = DataPath::parse(&text)?;
                Ok(DataValue::object(Rc::new(PathReference::new(path, &resolver))))
            }
            _ => Err(AdminError::conversion(
                "CONVERT_NOT_PATH",
                format!("Cannot convert path: {} to data path reference.", text),
            )),
        }
    }
}
