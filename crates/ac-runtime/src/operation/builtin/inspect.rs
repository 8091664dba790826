use std::rc::Rc;

use ac_core::{AdminError, AdminResult, DataValue, ValueType};
use indexmap::IndexMap;

use super::target;
use crate::operation::{Operation, OperationContext, OperationResponse};
use crate::storage::Storage;

struct InfoOperation {
    target: DataValue,
}

impl Operation for InfoOperation {
    fn run(&self, _context: &Rc<OperationContext>) -> AdminResult<OperationResponse> {
        Ok(OperationResponse::succeeded_with(
            self.target.type_and_value_description(),
        ))
    }
}

pub(super) fn info(
    context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    Ok(Box::new(InfoOperation {
        target: target(context, storage, &ValueType::Any)?,
    }))
}

/// Lists the entries of a holder or map, one `key: value` line each.
struct DataInfoOperation {
    target: DataValue,
    entries: IndexMap<String, DataValue>,
    key_filters: Vec<String>,
    value_filters: Vec<String>,
}

impl DataInfoOperation {
    fn passes(&self, key: &str, value: &DataValue) -> bool {
        let key = key.to_lowercase();
        let value = value.describe().to_lowercase();
        self.key_filters.iter().all(|filter| key.contains(filter))
            && self.value_filters.iter().all(|filter| value.contains(filter))
    }
}

impl Operation for DataInfoOperation {
    fn run(&self, _context: &Rc<OperationContext>) -> AdminResult<OperationResponse> {
        let lines = self
            .entries
            .iter()
            .filter(|(key, value)| self.passes(key, value))
            .map(|(key, value)| format!("{}: {}", key, value.describe()));
        Ok(OperationResponse::succeeded_with(self.target.type_and_value_description()).with_messages(lines))
    }
}

fn filters(storage: &Storage, key: &str) -> Vec<String> {
    storage
        .get_collection(key, &ValueType::list(ValueType::Text), true)
        .and_then(|filters| filters.elements())
        .unwrap_or_default()
        .iter()
        .map(|filter| filter.to_text().to_lowercase())
        .collect()
}

pub(super) fn data_info(
    context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    let target = target(context, storage, &ValueType::Any)?;
    let entries = if let Some(holder) = target.as_holder() {
        holder.contents()
    } else if let Some(map) = target.as_map() {
        map.borrow()
            .iter()
            .map(|(key, value)| (key.to_text(), value.clone()))
            .collect()
    } else {
        return Err(AdminError::invalid_input(
            "INPUT_NOT_HOLDER",
            format!("{} does not hold any data.", target.type_and_value_description()),
        ));
    };
    Ok(Box::new(DataInfoOperation {
        target,
        entries,
        key_filters: filters(storage, "key-filters"),
        value_filters: filters(storage, "value-filters"),
    }))
}
