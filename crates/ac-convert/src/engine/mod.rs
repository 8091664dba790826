use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use ac_core::text::split_on_spaces_and_commas;
use ac_core::{
    AdminError, AdminResult, DataKey, DataValue, ValueType, ANY_TYPE, ENUM_FAMILY, HOLDER_TYPE,
    REFERENCE_TYPE,
};
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::cache::{CacheTag, TypeCache};
use crate::converters::{
    BoolConverter, CollectionConverter, DateConverter, DecimalConverter, EnumConverter,
    FloatConverter, IntegerConverter, TextConverter, TypeConverter, UuidConverter,
};
use crate::mappings::{default_type_mappings, parse_type_expression};

/// Produces exactly one target type. Only consulted when the input does not
/// already satisfy it.
pub trait Converter {
    fn target(&self) -> ValueType;

    fn convert(
        &self,
        engine: &ConversionEngine,
        input: &DataValue,
        requested: &ValueType,
    ) -> AdminResult<DataValue>;
}

/// Produces any member of a type family, parameterized by the requested type.
pub trait SuperTypeConverter {
    fn family(&self) -> &str;

    fn convert(
        &self,
        engine: &ConversionEngine,
        input: &DataValue,
        requested: &ValueType,
    ) -> AdminResult<DataValue>;
}

/// Tried before anything else, in registration order. `None` passes.
pub trait ConversionOverride {
    fn convert(
        &self,
        engine: &ConversionEngine,
        input: &DataValue,
        requested: &ValueType,
    ) -> Option<DataValue>;
}

pub struct ConversionEngine {
    converters: RefCell<HashMap<String, Rc<dyn Converter>>>,
    super_converters: RefCell<HashMap<String, Rc<dyn SuperTypeConverter>>>,
    overrides: RefCell<Vec<Rc<dyn ConversionOverride>>>,
    type_parents: RefCell<HashMap<String, Vec<String>>>,
    enums: RefCell<HashMap<String, Vec<String>>>,
    referencable: RefCell<HashSet<String>>,
    mappings: RefCell<HashMap<String, ValueType>>,
    cache: TypeCache,
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::new()
    }
}

include!("lookup.rs");
include!("containers.rs");
include!("tests.rs");
