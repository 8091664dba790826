use std::str::FromStr;

use ac_core::{
    AdminError, AdminResult, DataKey, DataValue, Symbol, ValueType, COLLECTION_FAMILY,
    DATE_FORMAT, ENUM_FAMILY,
};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::engine::{ConversionEngine, Converter, SuperTypeConverter};

const DECIMAL_SCALE: u32 = 2;

fn not_a_number(input: &DataValue) -> AdminError {
    AdminError::conversion(
        "CONVERT_NOT_NUMBER",
        format!("{} is not a number.", input.to_text()),
    )
}

pub struct BoolConverter;

impl Converter for BoolConverter {
    fn target(&self) -> ValueType {
        ValueType::Bool
    }

    fn convert(
        &self,
        _engine: &ConversionEngine,
        input: &DataValue,
        _requested: &ValueType,
    ) -> AdminResult<DataValue> {
        let Some(text) = input.as_text() else {
            return Err(AdminError::conversion("CONVERT_NOT_BOOLEAN", "Invalid input"));
        };
        match text.to_lowercase().as_str() {
            "yes" | "true" => Ok(DataValue::Bool(true)),
            "no" | "false" => Ok(DataValue::Bool(false)),
            _ => Err(AdminError::conversion(
                "CONVERT_NOT_BOOLEAN",
                "Input must be true, yes, false or no.",
            )),
        }
    }
}

/// Parses whole numbers for one fixed width; never truncates.
pub struct IntegerConverter {
    ty: ValueType,
}

impl IntegerConverter {
    pub fn new(ty: ValueType) -> Self {
        Self { ty }
    }
}

impl Converter for IntegerConverter {
    fn target(&self) -> ValueType {
        self.ty.clone()
    }

    fn convert(
        &self,
        _engine: &ConversionEngine,
        input: &DataValue,
        _requested: &ValueType,
    ) -> AdminResult<DataValue> {
        let parsed = match input {
            DataValue::Integer(number) => Some(*number),
            other => other.to_text().trim().parse::<i64>().ok(),
        };
        let (min, max) = self.ty.integer_bounds().unwrap_or((i64::MIN, i64::MAX));
        match parsed {
            Some(number) if (min..=max).contains(&number) => Ok(DataValue::Integer(number)),
            _ if self.ty == ValueType::Byte => Err(AdminError::conversion(
                "CONVERT_NOT_NUMBER",
                format!("{} is not a byte.", input.to_text()),
            )),
            _ => Err(not_a_number(input)),
        }
    }
}

pub struct FloatConverter {
    ty: ValueType,
}

impl FloatConverter {
    pub fn new(ty: ValueType) -> Self {
        Self { ty }
    }
}

impl Converter for FloatConverter {
    fn target(&self) -> ValueType {
        self.ty.clone()
    }

    fn convert(
        &self,
        _engine: &ConversionEngine,
        input: &DataValue,
        _requested: &ValueType,
    ) -> AdminResult<DataValue> {
        parse_f64(input).map(DataValue::Float)
    }
}

fn parse_f64(input: &DataValue) -> AdminResult<f64> {
    match input {
        DataValue::Float(number) => Ok(*number),
        DataValue::Integer(number) => Ok(*number as f64),
        other => other
            .to_text()
            .trim()
            .parse::<f64>()
            .map_err(|_| not_a_number(input)),
    }
}

/// Goes through a double and settles on two decimals, rounding away from
/// zero. Precision beyond what a double carries is lost.
pub struct DecimalConverter;

impl Converter for DecimalConverter {
    fn target(&self) -> ValueType {
        ValueType::Decimal
    }

    fn convert(
        &self,
        _engine: &ConversionEngine,
        input: &DataValue,
        _requested: &ValueType,
    ) -> AdminResult<DataValue> {
        let number = parse_f64(input)?;
        let mut decimal = Decimal::from_str(&number.to_string())
            .map_err(|_| not_a_number(input))?
            .round_dp_with_strategy(DECIMAL_SCALE, RoundingStrategy::AwayFromZero);
        decimal.rescale(DECIMAL_SCALE);
        Ok(DataValue::Decimal(decimal))
    }
}

pub struct TextConverter;

impl Converter for TextConverter {
    fn target(&self) -> ValueType {
        ValueType::Text
    }

    fn convert(
        &self,
        _engine: &ConversionEngine,
        input: &DataValue,
        _requested: &ValueType,
    ) -> AdminResult<DataValue> {
        Ok(DataValue::Text(input.to_text()))
    }
}

pub struct UuidConverter;

impl Converter for UuidConverter {
    fn target(&self) -> ValueType {
        ValueType::Uuid
    }

    fn convert(
        &self,
        _engine: &ConversionEngine,
        input: &DataValue,
        _requested: &ValueType,
    ) -> AdminResult<DataValue> {
        let text = input.to_text();
        Uuid::parse_str(text.trim())
            .map(DataValue::Uuid)
            .map_err(|_| {
                AdminError::conversion("CONVERT_NOT_UUID", format!("{} is not a UUID.", text))
            })
    }
}

pub struct DateConverter;

impl Converter for DateConverter {
    fn target(&self) -> ValueType {
        ValueType::Date
    }

    fn convert(
        &self,
        _engine: &ConversionEngine,
        input: &DataValue,
        _requested: &ValueType,
    ) -> AdminResult<DataValue> {
        let text = input.to_text();
        NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
            .map(DataValue::Date)
            .map_err(|_| {
                AdminError::conversion(
                    "CONVERT_NOT_DATE",
                    format!("Unable to parse {}. Format: day-month-year", text),
                )
            })
    }
}

/// Type names, including generic container forms, through the engine's
/// mapping table.
pub struct TypeConverter;

impl Converter for TypeConverter {
    fn target(&self) -> ValueType {
        ValueType::Type
    }

    fn convert(
        &self,
        engine: &ConversionEngine,
        input: &DataValue,
        _requested: &ValueType,
    ) -> AdminResult<DataValue> {
        let text = input.to_text();
        engine.parse_type(&text).map(DataValue::Type).ok_or_else(|| {
            AdminError::conversion(
                "CONVERT_UNMAPPED_TYPE",
                format!("{} does not correspond to any mapped type.", text),
            )
        })
    }
}

/// Any declared enum. Matching ignores case and reads spaces as underscores.
pub struct EnumConverter;

impl SuperTypeConverter for EnumConverter {
    fn family(&self) -> &str {
        ENUM_FAMILY
    }

    fn convert(
        &self,
        engine: &ConversionEngine,
        input: &DataValue,
        requested: &ValueType,
    ) -> AdminResult<DataValue> {
        let invalid = || {
            AdminError::conversion(
                "CONVERT_ENUM_VARIANT",
                format!("Invalid input: {}", input.to_text()),
            )
        };
        let ValueType::Named(name) = requested else {
            return Err(invalid());
        };
        let variants = engine.enum_variants(name).ok_or_else(invalid)?;
        let wanted = input.to_text().trim().to_uppercase().replace(' ', "_");
        if variants.contains(&wanted) {
            Ok(DataValue::Symbol(Symbol::new(name.clone(), wanted)))
        } else {
            Err(invalid())
        }
    }
}

/// Wraps a raw value as the single element of the requested container.
pub struct CollectionConverter;

impl SuperTypeConverter for CollectionConverter {
    fn family(&self) -> &str {
        COLLECTION_FAMILY
    }

    fn convert(
        &self,
        _engine: &ConversionEngine,
        input: &DataValue,
        requested: &ValueType,
    ) -> AdminResult<DataValue> {
        match requested {
            ValueType::Set(_) => DataKey::from_value(input)
                .map(|key| DataValue::set([key]))
                .ok_or_else(|| {
                    AdminError::conversion(
                        "CONVERT_UNHASHABLE_KEY",
                        format!("{} cannot be stored in a set.", input.to_text()),
                    )
                }),
            ValueType::List(_) | ValueType::Collection(_) => Ok(DataValue::list(vec![input.clone()])),
            other => Err(AdminError::conversion(
                "CONVERT_NO_CONVERTER",
                format!("Unable to convert collection type {}", other),
            )),
        }
    }
}
