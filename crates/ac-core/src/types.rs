use std::fmt;

pub const ANY_TYPE: &str = "any";
pub const COLLECTION_FAMILY: &str = "collection";
pub const ENUM_FAMILY: &str = "enum";
pub const HOLDER_TYPE: &str = "holder";
pub const REFERENCE_TYPE: &str = "data-reference";
pub const REGISTRY_TYPE: &str = "registry";
pub const STORAGE_TYPE: &str = "storage";

/// A requested target type. Container types carry their element types; named
/// types cover enums, objects and families declared at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Any,
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Text,
    Uuid,
    Date,
    Type,
    List(Box<ValueType>),
    Set(Box<ValueType>),
    Collection(Box<ValueType>),
    Map(Box<ValueType>, Box<ValueType>),
    Named(String),
}

impl ValueType {
    pub fn list(element: ValueType) -> Self {
        Self::List(Box::new(element))
    }

    pub fn set(element: ValueType) -> Self {
        Self::Set(Box::new(element))
    }

    pub fn collection(element: ValueType) -> Self {
        Self::Collection(Box::new(element))
    }

    pub fn map(key: ValueType, value: ValueType) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Identifier with element types erased. Exact converters are keyed by it.
    pub fn type_id(&self) -> String {
        match self {
            Self::Any => ANY_TYPE.to_string(),
            Self::Bool => "boolean".to_string(),
            Self::Byte => "byte".to_string(),
            Self::Short => "short".to_string(),
            Self::Int => "int".to_string(),
            Self::Long => "long".to_string(),
            Self::Float => "float".to_string(),
            Self::Double => "double".to_string(),
            Self::Decimal => "decimal".to_string(),
            Self::Text => "string".to_string(),
            Self::Uuid => "uuid".to_string(),
            Self::Date => "date".to_string(),
            Self::Type => "type".to_string(),
            Self::List(_) => "list".to_string(),
            Self::Set(_) => "set".to_string(),
            Self::Collection(_) => COLLECTION_FAMILY.to_string(),
            Self::Map(_, _) => "map".to_string(),
            Self::Named(name) => name.clone(),
        }
    }

    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            Self::List(element) | Self::Set(element) | Self::Collection(element) => Some(element),
            _ => None,
        }
    }

    pub fn key_value_types(&self) -> Option<(&ValueType, &ValueType)> {
        match self {
            Self::Map(key, value) => Some((key, value)),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_) | Self::Set(_) | Self::Collection(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_, _))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Byte | Self::Short | Self::Int | Self::Long)
    }

    /// Families every instance of this type belongs to regardless of
    /// runtime declarations.
    pub fn builtin_families(&self) -> &'static [&'static str] {
        match self {
            Self::List(_) | Self::Set(_) | Self::Collection(_) => &[COLLECTION_FAMILY],
            _ => &[],
        }
    }

    /// Inclusive integer bounds for the fixed width integer types.
    pub fn integer_bounds(&self) -> Option<(i64, i64)> {
        match self {
            Self::Byte => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::Short => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Int => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::Long => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(element) => write!(f, "list<{}>", element),
            Self::Set(element) => write!(f, "set<{}>", element),
            Self::Collection(element) => write!(f, "collection<{}>", element),
            Self::Map(key, value) => write!(f, "map<{},{}>", key, value),
            other => f.write_str(&other.type_id()),
        }
    }
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn type_id_erases_element_types() {
        assert_eq!(ValueType::list(ValueType::Int).type_id(), "list");
        assert_eq!(ValueType::map(ValueType::Text, ValueType::Int).type_id(), "map");
        assert_eq!(ValueType::named("comparison-operator").type_id(), "comparison-operator");
    }

    #[test]
    fn display_keeps_generic_arguments() {
        let ty = ValueType::map(ValueType::Text, ValueType::list(ValueType::Long));
        assert_eq!(ty.to_string(), "map<string,list<long>>");
    }

    #[test]
    fn collections_belong_to_collection_family() {
        assert_eq!(
            ValueType::set(ValueType::Text).builtin_families(),
            &[COLLECTION_FAMILY]
        );
        assert!(ValueType::Text.builtin_families().is_empty());
    }

    #[test]
    fn integer_bounds_follow_width() {
        assert_eq!(ValueType::Byte.integer_bounds(), Some((-128, 127)));
        assert_eq!(ValueType::Int.integer_bounds(), Some((i32::MIN as i64, i32::MAX as i64)));
        assert_eq!(ValueType::Text.integer_bounds(), None);
    }
}
