//! Operations every module registers.

use std::rc::Rc;

use ac_core::{downcast_object, AdminError, AdminResult, DataValue, ValueType, REGISTRY_TYPE};

use super::context::OperationContext;
use super::template::OperationTemplate;
use crate::registry::Registry;
use crate::storage::Storage;

mod compare;
mod constraints;
mod inspect;

pub const KEY_TARGET: &str = "target";
pub const KEY_REGISTRY: &str = "registry";

/// Built-in operation names with the variables they read.
pub fn builtin_templates() -> Vec<OperationTemplate> {
    const TARGETED: [&str; 2] = [KEY_TARGET, KEY_REGISTRY];
    const SIZES: [&str; 4] = [KEY_TARGET, KEY_REGISTRY, "min-size", "max-size"];
    vec![
        OperationTemplate::simple("comparison", &["left", "operator", "right"], compare::comparison),
        OperationTemplate::simple(
            "element-of",
            &["left", "operator", "right", "inverted"],
            compare::element_of,
        ),
        OperationTemplate::simple("info", &TARGETED, inspect::info),
        OperationTemplate::simple(
            "data-info",
            &[KEY_TARGET, KEY_REGISTRY, "key-filters", "value-filters"],
            inspect::data_info,
        ),
        OperationTemplate::simple(
            "filter",
            &[KEY_TARGET, KEY_REGISTRY, "type", "allowed-values", "blocked-values"],
            constraints::filter,
        ),
        OperationTemplate::simple(
            "string-length",
            &[KEY_TARGET, KEY_REGISTRY, "min-length", "max-length"],
            constraints::string_length,
        ),
        OperationTemplate::simple("string-only-ascii", &TARGETED, constraints::only_ascii),
        OperationTemplate::simple("string-only-letters", &TARGETED, constraints::only_letters),
        OperationTemplate::simple("collection-size", &SIZES, constraints::collection_size),
        OperationTemplate::simple("int-size", &SIZES, constraints::int_size),
        OperationTemplate::simple("long-size", &SIZES, constraints::long_size),
        OperationTemplate::simple("double-size", &SIZES, constraints::double_size),
        OperationTemplate::simple("decimal-size", &SIZES, constraints::decimal_size),
    ]
}

/// The `registry` variable, when it names a registry.
fn target_registry(storage: &Storage) -> Option<DataValue> {
    storage.get_as(KEY_REGISTRY, &ValueType::named(REGISTRY_TYPE))
}

fn registry_lookup(
    context: &OperationContext,
    storage: &Storage,
    registry: &DataValue,
) -> AdminResult<DataValue> {
    let key = storage.get_and_assert_text(KEY_TARGET)?;
    context.resolver().resolve(registry, &key).map_err(|_| {
        let name = registry
            .as_object()
            .and_then(downcast_object::<Registry>)
            .map(|registry| registry.key().to_string())
            .unwrap_or_else(|| registry.describe());
        AdminError::invalid_input(
            "INPUT_NOT_REGISTERED",
            format!("Could not find value for key {} in registry {}", key, name),
        )
    })
}

/// `target` as `ty`, looked up inside `registry` when that is set.
pub(crate) fn target(
    context: &Rc<OperationContext>,
    storage: &Storage,
    ty: &ValueType,
) -> AdminResult<DataValue> {
    match target_registry(storage) {
        Some(registry) => {
            let found = registry_lookup(context, storage, &registry)?;
            context
                .conversions()
                .convert(&found, ty)
                .map_err(|error| error.into_invalid_input("INPUT_UNCONVERTIBLE"))
        }
        None => storage.get_and_assert(KEY_TARGET, ty),
    }
}

/// `target` as a collection of at least `min_size` elements.
pub(crate) fn collection_target(
    context: &Rc<OperationContext>,
    storage: &Storage,
    ty: &ValueType,
    min_size: usize,
) -> AdminResult<DataValue> {
    let Some(registry) = target_registry(storage) else {
        return storage.get_and_assert_collection(KEY_TARGET, ty, min_size);
    };
    let found = registry_lookup(context, storage, &registry)?;
    let collection = context
        .conversions()
        .convert_to_collection(Some(&found), ty, false)
        .ok_or_else(|| {
            AdminError::invalid_input(
                "INPUT_UNCONVERTIBLE",
                format!(
                    "{} could not be converted to a {}",
                    found.type_and_value_description(),
                    ty
                ),
            )
        })?;
    let size = collection.len().unwrap_or(0);
    if size < min_size {
        return Err(AdminError::invalid_input(
            "INPUT_TOO_SMALL",
            format!(
                "Collection must have a minimum of {} elements. It has: {}",
                min_size, size
            ),
        ));
    }
    Ok(collection)
}

/// Single-element collections read as their element.
fn unwrap_single(value: DataValue) -> DataValue {
    match value.elements() {
        Some(mut elements) if elements.len() == 1 => elements.remove(0),
        _ => value,
    }
}

#[cfg(test)]
mod tests;
