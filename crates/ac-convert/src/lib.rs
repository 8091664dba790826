mod cache;
mod converters;
mod engine;
mod mappings;

pub use cache::CacheTag;
pub use converters::{
    BoolConverter, CollectionConverter, DateConverter, DecimalConverter, EnumConverter,
    FloatConverter, IntegerConverter, TextConverter, TypeConverter, UuidConverter,
};
pub use engine::{ConversionEngine, ConversionOverride, Converter, SuperTypeConverter};
pub use mappings::{default_type_mappings, parse_type_expression};
