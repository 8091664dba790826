use std::cmp::Ordering;

use ac_convert::{ConversionEngine, Converter};
use ac_core::{AdminError, AdminResult, DataValue, Symbol, ValueType};

pub const COMPARISON_OPERATOR_TYPE: &str = "comparison-operator";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl ComparisonOperator {
    pub const ALL: [ComparisonOperator; 6] = [
        Self::Equal,
        Self::NotEqual,
        Self::Greater,
        Self::GreaterOrEqual,
        Self::Less,
        Self::LessOrEqual,
    ];

    pub fn variant(self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::NotEqual => "NOT_EQUAL",
            Self::Greater => "GREATER",
            Self::GreaterOrEqual => "GREATER_OR_EQUAL",
            Self::Less => "LESS",
            Self::LessOrEqual => "LESS_OR_EQUAL",
        }
    }

    /// Accepts variant names in any case (spaces for underscores) and the
    /// usual symbols such as `>=`.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_uppercase().replace([' ', '-'], "_");
        let operator = match normalized.as_str() {
            "==" | "=" | "EQUALS" => Self::Equal,
            "!=" | "<>" | "NOT_EQUALS" => Self::NotEqual,
            ">" | "GREATER_THAN" => Self::Greater,
            ">=" => Self::GreaterOrEqual,
            "<" | "LESS_THAN" => Self::Less,
            "<=" => Self::LessOrEqual,
            other => return Self::ALL.into_iter().find(|op| op.variant() == other),
        };
        Some(operator)
    }

    pub fn from_symbol(symbol: &Symbol) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|operator| operator.variant() == symbol.variant)
    }

    pub fn to_symbol(self) -> Symbol {
        Symbol::new(COMPARISON_OPERATOR_TYPE, self.variant())
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Equal => ordering == Ordering::Equal,
            Self::NotEqual => ordering != Ordering::Equal,
            Self::Greater => ordering == Ordering::Greater,
            Self::GreaterOrEqual => ordering != Ordering::Less,
            Self::Less => ordering == Ordering::Less,
            Self::LessOrEqual => ordering != Ordering::Greater,
        }
    }

    /// `left <op> right`. Collections on either side compare every element
    /// pairing and all pairings must hold. Values without a natural order
    /// only support equality.
    pub fn compare(self, left: &DataValue, right: &DataValue) -> bool {
        match (left.elements(), right.elements()) {
            (Some(lefts), Some(rights)) => lefts
                .iter()
                .all(|left| rights.iter().all(|right| self.compare_scalars(left, right))),
            (Some(lefts), None) => lefts.iter().all(|left| self.compare_scalars(left, right)),
            (None, Some(rights)) => rights.iter().all(|right| self.compare_scalars(left, right)),
            (None, None) => self.compare_scalars(left, right),
        }
    }

    fn compare_scalars(self, left: &DataValue, right: &DataValue) -> bool {
        match left.compare(right) {
            Some(ordering) => self.accepts(ordering),
            None => match self {
                Self::Equal => left == right,
                Self::NotEqual => left != right,
                _ => false,
            },
        }
    }

    /// Membership reading of the operator: `EQUAL` means both sides hold the
    /// same elements, `LESS` means the left side is a strict part of the
    /// right side, `GREATER` the reverse. Scalars count as single elements
    /// and holders as the set of their keys.
    pub fn element_of(self, left: &DataValue, right: &DataValue) -> bool {
        let lefts = members(left);
        let rights = members(right);
        let left_in_right = lefts.iter().all(|element| contains(right, &rights, element));
        let right_in_left = rights.iter().all(|element| contains(left, &lefts, element));
        let (left_len, right_len) = (lefts.len(), rights.len());
        let equal = left_len == right_len && left_in_right && right_in_left;
        match self {
            Self::Equal => equal,
            Self::NotEqual => !equal,
            Self::Greater => left_len > right_len && right_in_left,
            Self::GreaterOrEqual => left_len >= right_len && right_in_left,
            Self::Less => left_len < right_len && left_in_right,
            Self::LessOrEqual => left_len <= right_len && left_in_right,
        }
    }
}

fn members(value: &DataValue) -> Vec<DataValue> {
    if let Some(elements) = value.elements() {
        return elements;
    }
    if let Some(holder) = value.as_holder() {
        return holder.contents().into_keys().map(DataValue::Text).collect();
    }
    vec![value.clone()]
}

fn contains(container: &DataValue, members: &[DataValue], element: &DataValue) -> bool {
    if let Some(holder) = container.as_holder() {
        return holder.get_value(element).is_some();
    }
    members.iter().any(|member| member == element)
}

/// Reads operators from their names and symbols.
pub(crate) struct ComparisonOperatorConverter;

impl Converter for ComparisonOperatorConverter {
    fn target(&self) -> ValueType {
        ValueType::named(COMPARISON_OPERATOR_TYPE)
    }

    fn convert(
        &self,
        _engine: &ConversionEngine,
        input: &DataValue,
        _requested: &ValueType,
    ) -> AdminResult<DataValue> {
        let text = input.to_text();
        ComparisonOperator::parse(&text)
            .map(|operator| DataValue::Symbol(operator.to_symbol()))
            .ok_or_else(|| {
                AdminError::conversion(
                    "CONVERT_ENUM_VARIANT",
                    format!("Invalid input: {}", text),
                )
            })
    }
}

/// Teaches `conversions` the operator type.
pub fn install_comparison_operator(conversions: &ConversionEngine) {
    let variants: Vec<&str> = ComparisonOperator::ALL
        .iter()
        .map(|operator| operator.variant())
        .collect();
    conversions.register_enum(COMPARISON_OPERATOR_TYPE, &variants);
    conversions.register_converter(std::rc::Rc::new(ComparisonOperatorConverter));
}
