use std::cmp::Ordering;
use std::rc::Rc;

use ac_core::text::{is_all_alphabetical, is_all_ascii};
use ac_core::{AdminError, AdminResult, DataValue, ValueType};

use super::{collection_target, target};
use crate::operation::{Operation, OperationContext, OperationResponse};
use crate::storage::Storage;

struct FilterConstraint {
    target: DataValue,
    allowed: Option<DataValue>,
    blocked: Option<DataValue>,
}

impl Operation for FilterConstraint {
    fn run(&self, _context: &Rc<OperationContext>) -> AdminResult<OperationResponse> {
        let permitted = self
            .allowed
            .as_ref()
            .map_or(true, |allowed| allowed.contains_element(&self.target));
        let blocked = self
            .blocked
            .as_ref()
            .is_some_and(|blocked| blocked.contains_element(&self.target));
        if permitted && !blocked {
            return Ok(OperationResponse::succeeded());
        }
        let response = OperationResponse::failed(format!("{} is not allowed.", self.target.describe()));
        Ok(match &self.allowed {
            Some(allowed) => response.with_message(format!("Allowed values: {}", allowed.describe())),
            None => response,
        })
    }
}

pub(super) fn filter(
    context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    let value_type = storage
        .get_as("type", &ValueType::Type)
        .and_then(|ty| ty.as_type().cloned())
        .unwrap_or(ValueType::Text);
    let values = ValueType::list(value_type.clone());
    let non_empty = |key: &str| {
        storage
            .get_collection(key, &values, false)
            .filter(|values| !values.is_empty())
    };
    let allowed = non_empty("allowed-values");
    let blocked = non_empty("blocked-values");
    if allowed.is_none() && blocked.is_none() {
        return Err(AdminError::invalid_input(
            "INPUT_FILTER_EMPTY",
            "allowed-values and blocked-values are both empty",
        ));
    }
    Ok(Box::new(FilterConstraint {
        target: target(context, storage, &value_type)?,
        allowed,
        blocked,
    }))
}

struct StringLengthConstraint {
    target: String,
    min: Option<usize>,
    max: Option<usize>,
}

impl Operation for StringLengthConstraint {
    fn run(&self, _context: &Rc<OperationContext>) -> AdminResult<OperationResponse> {
        let length = self.target.chars().count();
        if let Some(min) = self.min.filter(|min| length < *min) {
            return Ok(OperationResponse::failed(format!(
                "Input must be at least {} characters long.",
                min
            )));
        }
        if let Some(max) = self.max.filter(|max| length > *max) {
            return Ok(OperationResponse::failed(format!(
                "Input cannot be longer than {} characters.",
                max
            )));
        }
        Ok(OperationResponse::succeeded())
    }
}

fn length_bound(storage: &Storage, key: &str) -> Option<usize> {
    storage
        .get_i64(key)
        .and_then(|bound| usize::try_from(bound).ok())
}

pub(super) fn string_length(
    context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    let min = length_bound(storage, "min-length");
    let max = length_bound(storage, "max-length");
    match (min, max) {
        (None, None) => {
            return Err(AdminError::invalid_input(
                "INPUT_BOUNDS_MISSING",
                "Neither min-length nor max-length is set.",
            ))
        }
        (Some(min), Some(max)) if max < min => {
            return Err(AdminError::invalid_input(
                "INPUT_BOUNDS_INVERTED",
                format!(
                    "Max length is smaller than min length. (min: {} max: {})",
                    min, max
                ),
            ))
        }
        _ => {}
    }
    let target = target(context, storage, &ValueType::Text)?.to_text();
    Ok(Box::new(StringLengthConstraint { target, min, max }))
}

/// Outcome of a text check, computed when the operation is built.
struct TextCheckConstraint {
    passed: bool,
    failure: &'static str,
}

impl Operation for TextCheckConstraint {
    fn run(&self, _context: &Rc<OperationContext>) -> AdminResult<OperationResponse> {
        Ok(if self.passed {
            OperationResponse::succeeded()
        } else {
            OperationResponse::failed(self.failure)
        })
    }
}

fn text_check(
    context: &Rc<OperationContext>,
    storage: &Storage,
    check: fn(&str) -> bool,
    failure: &'static str,
) -> AdminResult<Box<dyn Operation>> {
    let text = target(context, storage, &ValueType::Text)?.to_text();
    Ok(Box::new(TextCheckConstraint {
        passed: check(&text),
        failure,
    }))
}

pub(super) fn only_ascii(
    context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    text_check(
        context,
        storage,
        is_all_ascii,
        "Input cannot contain non-ASCII characters.",
    )
}

pub(super) fn only_letters(
    context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    text_check(
        context,
        storage,
        is_all_alphabetical,
        "Input cannot contain non-alphabetical characters.",
    )
}

/// Bounds check on a number, or on the element count of a collection.
struct SizeConstraint {
    measured: DataValue,
    min: Option<DataValue>,
    max: Option<DataValue>,
    counts_elements: bool,
}

impl Operation for SizeConstraint {
    fn run(&self, _context: &Rc<OperationContext>) -> AdminResult<OperationResponse> {
        let below = |bound: &DataValue| self.measured.compare(bound) == Some(Ordering::Less);
        let above = |bound: &DataValue| self.measured.compare(bound) == Some(Ordering::Greater);
        if let Some(min) = self.min.as_ref().filter(|min| below(min)) {
            return Ok(OperationResponse::failed(if self.counts_elements {
                format!("Input must have at least {} elements.", min.to_text())
            } else {
                format!("Input cannot be lower than {}.", min.to_text())
            }));
        }
        if let Some(max) = self.max.as_ref().filter(|max| above(max)) {
            return Ok(OperationResponse::failed(if self.counts_elements {
                format!("Input cannot have more than {} elements.", max.to_text())
            } else {
                format!("Input cannot be higher than {}.", max.to_text())
            }));
        }
        Ok(OperationResponse::succeeded())
    }
}

fn size_bounds(
    storage: &Storage,
    bound_type: &ValueType,
) -> AdminResult<(Option<DataValue>, Option<DataValue>)> {
    let min = storage.get_as("min-size", bound_type);
    let max = storage.get_as("max-size", bound_type);
    if min.is_none() && max.is_none() {
        return Err(AdminError::invalid_input(
            "INPUT_BOUNDS_MISSING",
            "Neither min-size nor max-size is set.",
        ));
    }
    Ok((min, max))
}

fn number_size(
    context: &Rc<OperationContext>,
    storage: &Storage,
    number_type: ValueType,
) -> AdminResult<Box<dyn Operation>> {
    let (min, max) = size_bounds(storage, &number_type)?;
    Ok(Box::new(SizeConstraint {
        measured: target(context, storage, &number_type)?,
        min,
        max,
        counts_elements: false,
    }))
}

pub(super) fn int_size(
    context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    number_size(context, storage, ValueType::Int)
}

pub(super) fn long_size(
    context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    number_size(context, storage, ValueType::Long)
}

pub(super) fn double_size(
    context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    number_size(context, storage, ValueType::Double)
}

pub(super) fn decimal_size(
    context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    number_size(context, storage, ValueType::Decimal)
}

pub(super) fn collection_size(
    context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    let (min, max) = size_bounds(storage, &ValueType::Long)?;
    let collection = collection_target(context, storage, &ValueType::list(ValueType::Any), 0)?;
    let count = collection.len().unwrap_or(0) as i64;
    Ok(Box::new(SizeConstraint {
        measured: DataValue::Integer(count),
        min,
        max,
        counts_elements: true,
    }))
}
