//! Procedures declared in configuration.
//!
//! ```yaml
//! check-name:
//!   variables: { name: $target }
//!   operations:
//!     short: { type: string-length, variables: { target: $name, max-length: 8 } }
//!     letters: { type: string-only-letters, variables: { target: $name } }
//!   conditionals:
//!     first: { if: [short], then: [letters], else: [info] }
//! ```

use std::rc::Rc;

use ac_core::{AdminError, AdminResult, DataValue, ValueType};
use indexmap::IndexMap;
use tracing::{debug, info};

use super::procedure::ProcedureTask;
use super::template::OperationTemplate;
use crate::module::OperationModule;
use crate::storage::Storage;
use crate::variable::Variable;

const KEY_VARIABLES: &str = "variables";
const KEY_OPERATIONS: &str = "operations";
const KEY_CONDITIONALS: &str = "conditionals";
const KEY_TYPE: &str = "type";

/// Registers every top-level node of `storage` as a procedure.
pub fn register_procedures(module: &OperationModule, storage: &Storage) -> AdminResult<usize> {
    let mut count = 0;
    for node in storage.nodes() {
        let procedure = create_procedure(module, &node)
            .map_err(|error| error.with_action("registering procedures"))?;
        module
            .register_operation(procedure)
            .map_err(|error| error.with_action("registering procedures"))?;
        count += 1;
    }
    info!(count, "registered procedures");
    Ok(count)
}

fn create_procedure(module: &OperationModule, node: &Storage) -> AdminResult<OperationTemplate> {
    let variables = create_variables(node);
    let operations = node.get_and_assert_storage(KEY_OPERATIONS)?;
    let steps = create_steps(module, &operations)?;
    let tasks = match node.get_storage(KEY_CONDITIONALS, false) {
        Some(conditionals) => conditionals
            .keys()
            .iter()
            .map(|key| create_task(module, &steps, &conditionals, key))
            .collect::<AdminResult<Vec<_>>>()?,
        None => vec![ProcedureTask::sequence(steps.values().cloned().collect())],
    };
    debug!(procedure = %node.storage_key(), steps = steps.len(), tasks = tasks.len(), "created procedure");
    Ok(OperationTemplate::procedure(node.storage_key(), variables, tasks))
}

/// Local steps keyed by their lowercased name, in declaration order.
fn create_steps(
    module: &OperationModule,
    operations: &Storage,
) -> AdminResult<IndexMap<String, Rc<OperationTemplate>>> {
    let mut steps = IndexMap::new();
    for node in operations.nodes() {
        let operation_type = node.get_and_assert_text(KEY_TYPE)?;
        let Some(inner) = module.operation(&operation_type) else {
            return Err(AdminError::construction(
                "TEMPLATE_UNKNOWN_OPERATION",
                format!(
                    "Did not find any Operation called: {} specified at: '{}.{}'",
                    operation_type,
                    node.storage_path(),
                    KEY_TYPE
                ),
            ));
        };
        let name = node.storage_key().to_lowercase();
        let step = OperationTemplate::wrapped(&name, create_variables(&node), inner);
        steps.insert(name, Rc::new(step));
    }
    Ok(steps)
}

/// A list of step names becomes a sequence; a node with `if`, `then` and
/// an optional `else` becomes a conditional.
fn create_task(
    module: &OperationModule,
    steps: &IndexMap<String, Rc<OperationTemplate>>,
    storage: &Storage,
    key: &str,
) -> AdminResult<ProcedureTask> {
    storage.assert_set(key)?;
    if let Some(node) = storage.get_storage(key, false) {
        let condition = create_task(module, steps, &node, "if")?;
        let then = create_task(module, steps, &node, "then")?;
        let otherwise = if node.is_set("else") {
            create_task(module, steps, &node, "else")?
        } else {
            ProcedureTask::sequence(Vec::new())
        };
        return Ok(ProcedureTask::conditional(condition, then, otherwise));
    }
    let names = storage.get_and_assert_collection(key, &ValueType::list(ValueType::Text), 0)?;
    let mut templates = Vec::new();
    for name in names.elements().unwrap_or_default() {
        let name = name.to_text().to_lowercase();
        let template = steps
            .get(&name)
            .cloned()
            .or_else(|| module.operation(&name));
        match template {
            Some(template) => templates.push(template),
            None => {
                return Err(AdminError::construction(
                    "TEMPLATE_UNKNOWN_OPERATION",
                    format!(
                        "Could not find operation: {} specified at: {}.{}",
                        name,
                        storage.storage_path(),
                        key
                    ),
                ))
            }
        }
    }
    Ok(ProcedureTask::sequence(templates))
}

fn create_variables(node: &Storage) -> Vec<Variable> {
    let Some(variables) = node.get_storage(KEY_VARIABLES, false) else {
        return Vec::new();
    };
    variables
        .contents()
        .into_iter()
        .map(|(name, value)| Variable::new(name, Some(plain_value(value))))
        .collect()
}

/// Nested storage nodes become plain maps again.
fn plain_value(value: DataValue) -> DataValue {
    match value.as_object().and_then(Storage::from_object) {
        Some(storage) => storage.to_map_value(),
        None => value,
    }
}
