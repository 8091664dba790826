use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::object::{same_object, DataHolder, DataObject, ObjectRef};
use crate::types::ValueType;

pub const DATE_FORMAT: &str = "%d-%m-%Y";

pub type ListRef = Rc<RefCell<Vec<DataValue>>>;
pub type SetRef = Rc<RefCell<IndexSet<DataKey>>>;
pub type MapRef = Rc<RefCell<IndexMap<DataKey, DataValue>>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Symbol {
    pub type_name: String,
    pub variant: String,
}

impl Symbol {
    pub fn new(type_name: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            variant: variant.into(),
        }
    }
}

/// Untyped value flowing through storage, paths and operations. Containers
/// are shared and interior-mutable so that their identity can be tracked.
#[derive(Clone)]
pub enum DataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Symbol(Symbol),
    Type(ValueType),
    List(ListRef),
    Set(SetRef),
    Map(MapRef),
    Object(ObjectRef),
}

/// The hashable subset of values, used for map keys and set elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataKey {
    Bool(bool),
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Symbol(Symbol),
}

impl DataKey {
    pub fn from_value(value: &DataValue) -> Option<Self> {
        match value {
            DataValue::Bool(value) => Some(Self::Bool(*value)),
            DataValue::Integer(value) => Some(Self::Integer(*value)),
            DataValue::Decimal(value) => Some(Self::Decimal(*value)),
            DataValue::Text(value) => Some(Self::Text(value.clone())),
            DataValue::Uuid(value) => Some(Self::Uuid(*value)),
            DataValue::Date(value) => Some(Self::Date(*value)),
            DataValue::Symbol(value) => Some(Self::Symbol(value.clone())),
            _ => None,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn to_value(&self) -> DataValue {
        match self {
            Self::Bool(value) => DataValue::Bool(*value),
            Self::Integer(value) => DataValue::Integer(*value),
            Self::Decimal(value) => DataValue::Decimal(*value),
            Self::Text(value) => DataValue::Text(value.clone()),
            Self::Uuid(value) => DataValue::Uuid(*value),
            Self::Date(value) => DataValue::Date(*value),
            Self::Symbol(value) => DataValue::Symbol(value.clone()),
        }
    }

    pub fn to_text(&self) -> String {
        self.to_value().to_text()
    }
}

impl DataValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn list(values: Vec<DataValue>) -> Self {
        Self::List(Rc::new(RefCell::new(values)))
    }

    pub fn set(values: impl IntoIterator<Item = DataKey>) -> Self {
        Self::Set(Rc::new(RefCell::new(values.into_iter().collect())))
    }

    pub fn map(entries: IndexMap<DataKey, DataValue>) -> Self {
        Self::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn text_map(entries: IndexMap<String, DataValue>) -> Self {
        Self::map(
            entries
                .into_iter()
                .map(|(key, value)| (DataKey::Text(key), value))
                .collect(),
        )
    }

    pub fn object<T: DataObject>(object: Rc<T>) -> Self {
        Self::Object(object)
    }

    /// Concrete type name, used to look up custom path resolvers.
    pub fn type_key(&self) -> String {
        match self {
            Self::Bool(_) => "boolean".to_string(),
            Self::Integer(_) => "integer".to_string(),
            Self::Float(_) => "float".to_string(),
            Self::Decimal(_) => "decimal".to_string(),
            Self::Text(_) => "string".to_string(),
            Self::Uuid(_) => "uuid".to_string(),
            Self::Date(_) => "date".to_string(),
            Self::Symbol(symbol) => symbol.type_name.clone(),
            Self::Type(_) => "type".to_string(),
            Self::List(_) => "list".to_string(),
            Self::Set(_) => "set".to_string(),
            Self::Map(_) => "map".to_string(),
            Self::Object(object) => object.type_name().to_string(),
        }
    }

    pub fn type_description(&self) -> String {
        match self {
            Self::Bool(_) => "Boolean".to_string(),
            Self::Integer(_) => "Integer".to_string(),
            Self::Float(_) => "Float".to_string(),
            Self::Decimal(_) => "Decimal".to_string(),
            Self::Text(_) => "Text".to_string(),
            Self::Uuid(_) => "UUID".to_string(),
            Self::Date(_) => "Date".to_string(),
            Self::Symbol(symbol) => symbol.type_name.clone(),
            Self::Type(_) => "Type".to_string(),
            Self::List(_) => "List".to_string(),
            Self::Set(_) => "Set".to_string(),
            Self::Map(_) => "Map".to_string(),
            Self::Object(object) => object.type_description(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Self::Symbol(symbol) => Some(symbol),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&ValueType> {
        match self {
            Self::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&SetRef> {
        match self {
            Self::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_holder(&self) -> Option<&dyn DataHolder> {
        self.as_object().and_then(|object| object.as_holder())
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Set(_))
    }

    /// Identity of a container instance, stable while the container lives.
    pub fn container_id(&self) -> Option<usize> {
        match self {
            Self::List(list) => Some(Rc::as_ptr(list) as *const () as usize),
            Self::Set(set) => Some(Rc::as_ptr(set) as *const () as usize),
            Self::Map(map) => Some(Rc::as_ptr(map) as *const () as usize),
            _ => None,
        }
    }

    pub fn same_instance(&self, other: &DataValue) -> bool {
        match (self, other) {
            (Self::List(left), Self::List(right)) => Rc::ptr_eq(left, right),
            (Self::Set(left), Self::Set(right)) => Rc::ptr_eq(left, right),
            (Self::Map(left), Self::Map(right)) => Rc::ptr_eq(left, right),
            (Self::Object(left), Self::Object(right)) => same_object(left, right),
            _ => false,
        }
    }

    /// Follows a live reference. `None` when the reference no longer resolves.
    pub fn dereferenced(&self) -> Option<DataValue> {
        if let Self::Object(object) = self {
            if let Some(target) = object.dereference() {
                return target;
            }
        }
        Some(self.clone())
    }

    pub fn len(&self) -> Option<usize> {
        match self {
            Self::List(list) => Some(list.borrow().len()),
            Self::Set(set) => Some(set.borrow().len()),
            Self::Map(map) => Some(map.borrow().len()),
            Self::Text(text) => Some(text.chars().count()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Snapshot of the elements of a sequence or set, references followed.
    pub fn elements(&self) -> Option<Vec<DataValue>> {
        match self {
            Self::List(list) => Some(
                list.borrow()
                    .iter()
                    .filter_map(DataValue::dereferenced)
                    .collect(),
            ),
            Self::Set(set) => Some(set.borrow().iter().map(DataKey::to_value).collect()),
            _ => None,
        }
    }

    pub fn contains_element(&self, needle: &DataValue) -> bool {
        self.elements()
            .map(|elements| elements.iter().any(|element| element == needle))
            .unwrap_or(false)
    }

    /// Plain textual form, the input every text-parsing converter reads.
    pub fn to_text(&self) -> String {
        match self {
            Self::Bool(value) => value.to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => format_float(*value),
            Self::Decimal(value) => value.to_string(),
            Self::Text(value) => value.clone(),
            Self::Uuid(value) => value.hyphenated().to_string(),
            Self::Date(value) => value.format(DATE_FORMAT).to_string(),
            Self::Symbol(symbol) => symbol.variant.clone(),
            Self::Type(ty) => ty.to_string(),
            Self::List(list) => format!(
                "[{}]",
                list.borrow()
                    .iter()
                    .map(DataValue::to_text)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Set(set) => format!(
                "[{}]",
                set.borrow()
                    .iter()
                    .map(DataKey::to_text)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Map(map) => format!(
                "{{{}}}",
                map.borrow()
                    .iter()
                    .map(|(key, value)| format!("{}={}", key.to_text(), value.to_text()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Object(object) => object.describe(),
        }
    }

    /// Human readable description used in responses.
    pub fn describe(&self) -> String {
        match self {
            Self::List(_) | Self::Set(_) => self
                .elements()
                .unwrap_or_default()
                .iter()
                .map(DataValue::describe)
                .collect::<Vec<_>>()
                .join(", "),
            Self::Map(map) => map
                .borrow()
                .iter()
                .map(|(key, value)| format!("{}: {}", key.to_text(), value.describe()))
                .collect::<Vec<_>>()
                .join(", "),
            Self::Symbol(symbol) => symbol.variant.to_lowercase().replace('_', " "),
            Self::Object(object) => match object.dereference() {
                Some(Some(target)) => target.describe(),
                Some(None) => "<missing>".to_string(),
                None => object.describe(),
            },
            other => other.to_text(),
        }
    }

    pub fn type_and_value_description(&self) -> String {
        format!("{}: {}", self.type_description(), self.describe())
    }

    /// Natural ordering between comparable values. Numbers compare across
    /// representations; text that reads as numbers on both sides compares
    /// numerically.
    pub fn compare(&self, other: &DataValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(left), Self::Bool(right)) => Some(left.cmp(right)),
            (Self::Integer(left), Self::Integer(right)) => Some(left.cmp(right)),
            (Self::Decimal(left), Self::Decimal(right)) => Some(left.cmp(right)),
            (Self::Integer(left), Self::Decimal(right)) => Some(Decimal::from(*left).cmp(right)),
            (Self::Decimal(left), Self::Integer(right)) => Some(left.cmp(&Decimal::from(*right))),
            (Self::Float(_), _) | (_, Self::Float(_)) => {
                let left = self.numeric_f64()?;
                let right = other.numeric_f64()?;
                left.partial_cmp(&right)
            }
            (Self::Text(left), Self::Text(right)) => {
                match (Decimal::from_str(left.trim()), Decimal::from_str(right.trim())) {
                    (Ok(left), Ok(right)) => Some(left.cmp(&right)),
                    _ => Some(left.cmp(right)),
                }
            }
            (Self::Uuid(left), Self::Uuid(right)) => Some(left.cmp(right)),
            (Self::Date(left), Self::Date(right)) => Some(left.cmp(right)),
            (Self::Symbol(left), Self::Symbol(right)) if left.type_name == right.type_name => {
                Some(left.variant.cmp(&right.variant))
            }
            _ => None,
        }
    }

    fn numeric_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Integer(value) => Some(*value as f64),
            Self::Decimal(value) => value.to_string().parse::<f64>().ok(),
            Self::Text(value) => value.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Integer(left), Self::Integer(right)) => left == right,
            (Self::Float(left), Self::Float(right)) => left == right,
            (Self::Decimal(left), Self::Decimal(right)) => left == right,
            (Self::Text(left), Self::Text(right)) => left == right,
            (Self::Uuid(left), Self::Uuid(right)) => left == right,
            (Self::Date(left), Self::Date(right)) => left == right,
            (Self::Symbol(left), Self::Symbol(right)) => left == right,
            (Self::Type(left), Self::Type(right)) => left == right,
            (Self::List(left), Self::List(right)) => {
                Rc::ptr_eq(left, right) || *left.borrow() == *right.borrow()
            }
            (Self::Set(left), Self::Set(right)) => {
                Rc::ptr_eq(left, right) || *left.borrow() == *right.borrow()
            }
            (Self::Map(left), Self::Map(right)) => {
                Rc::ptr_eq(left, right) || *left.borrow() == *right.borrow()
            }
            (Self::Object(left), Self::Object(right)) => {
                if same_object(left, right) {
                    return true;
                }
                match (left.dereference(), right.dereference()) {
                    (Some(Some(left)), Some(Some(right))) => left == right,
                    (Some(Some(left)), None) => left == *other,
                    (None, Some(Some(right))) => *self == right,
                    _ => false,
                }
            }
            (Self::Object(object), value) | (value, Self::Object(object)) => {
                matches!(object.dereference(), Some(Some(target)) if target == *value)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "Bool({})", value),
            Self::Integer(value) => write!(f, "Integer({})", value),
            Self::Float(value) => write!(f, "Float({})", value),
            Self::Decimal(value) => write!(f, "Decimal({})", value),
            Self::Text(value) => write!(f, "Text({:?})", value),
            Self::Uuid(value) => write!(f, "Uuid({})", value),
            Self::Date(value) => write!(f, "Date({})", value),
            Self::Symbol(symbol) => write!(f, "Symbol({}::{})", symbol.type_name, symbol.variant),
            Self::Type(ty) => write!(f, "Type({})", ty),
            Self::List(list) => f.debug_list().entries(list.borrow().iter()).finish(),
            Self::Set(set) => f.debug_set().entries(set.borrow().iter()).finish(),
            Self::Map(map) => f.debug_map().entries(map.borrow().iter()).finish(),
            Self::Object(object) => write!(f, "{:?}", object),
        }
    }
}

impl Serialize for DataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Float(value) => serializer.serialize_f64(*value),
            Self::List(_) | Self::Set(_) => {
                let elements = self.elements().unwrap_or_default();
                let mut seq = serializer.serialize_seq(Some(elements.len()))?;
                for element in &elements {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Self::Map(map) => {
                let map = map.borrow();
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map.iter() {
                    out.serialize_entry(&key.to_text(), value)?;
                }
                out.end()
            }
            Self::Object(object) => match object.as_holder() {
                Some(holder) => {
                    let contents = holder.contents();
                    let mut out = serializer.serialize_map(Some(contents.len()))?;
                    for (key, value) in contents.iter() {
                        out.serialize_entry(key, value)?;
                    }
                    out.end()
                }
                None => serializer.serialize_str(&self.describe()),
            },
            other => serializer.serialize_str(&other.to_text()),
        }
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Decimal> for DataValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

#[cfg(test)]
mod value_tests {
    use super::*;

    fn texts(values: &[&str]) -> DataValue {
        DataValue::list(values.iter().map(|value| DataValue::from(*value)).collect())
    }

    #[test]
    fn text_forms_follow_value_kind() {
        assert_eq!(DataValue::Float(5.0).to_text(), "5.0");
        assert_eq!(DataValue::Float(2.5).to_text(), "2.5");
        assert_eq!(texts(&["a", "b"]).to_text(), "[a, b]");
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).expect("date");
        assert_eq!(DataValue::Date(date).to_text(), "31-12-2024");
        let mut entries = IndexMap::new();
        entries.insert("x".to_string(), DataValue::Integer(1));
        assert_eq!(DataValue::text_map(entries).to_text(), "{x=1}");
    }

    #[test]
    fn describe_joins_collections_and_humanizes_symbols() {
        assert_eq!(texts(&["a", "b"]).describe(), "a, b");
        let symbol = DataValue::Symbol(Symbol::new("comparison-operator", "NOT_EQUAL"));
        assert_eq!(symbol.describe(), "not equal");
        assert_eq!(DataValue::Integer(3).type_and_value_description(), "Integer: 3");
    }

    #[test]
    fn equality_is_structural_for_containers() {
        assert_eq!(texts(&["a"]), texts(&["a"]));
        assert_ne!(texts(&["a"]), texts(&["b"]));
        assert_ne!(DataValue::Integer(1), DataValue::Float(1.0));
    }

    #[test]
    fn container_identity_is_tracked() {
        let list = texts(&["a"]);
        let alias = list.clone();
        assert!(list.same_instance(&alias));
        assert_eq!(list.container_id(), alias.container_id());
        assert!(!list.same_instance(&texts(&["a"])));
        assert_eq!(DataValue::Integer(1).container_id(), None);
    }

    #[test]
    fn compare_orders_numbers_across_representations() {
        assert_eq!(
            DataValue::Integer(2).compare(&DataValue::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            DataValue::text("10").compare(&DataValue::text("9")),
            Some(Ordering::Greater)
        );
        assert_eq!(
            DataValue::text("apple").compare(&DataValue::text("banana")),
            Some(Ordering::Less)
        );
        assert_eq!(DataValue::Bool(true).compare(&DataValue::Integer(1)), None);
    }

    #[test]
    fn keys_round_trip_hashable_values() {
        let key = DataKey::from_value(&DataValue::text("k")).expect("key");
        assert_eq!(key.to_value(), DataValue::text("k"));
        assert!(DataKey::from_value(&DataValue::Float(1.5)).is_none());
        assert!(DataKey::from_value(&texts(&["a"])).is_none());
    }

    #[test]
    fn serializes_nested_containers_as_json() {
        let mut entries = IndexMap::new();
        entries.insert("names".to_string(), texts(&["a", "b"]));
        entries.insert("count".to_string(), DataValue::Integer(2));
        let json = serde_json::to_string(&DataValue::text_map(entries)).expect("json");
        assert_eq!(json, r#"{"names":["a","b"],"count":2}"#);
    }
}
