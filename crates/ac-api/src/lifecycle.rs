use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use ac_core::{downcast_object, AdminError, AdminResult, DataObject, ValueType};
use ac_runtime::operation::builtin::KEY_TARGET;
use ac_runtime::{Operation, OperationContext, OperationResponse, Storage};
use tracing::info;

pub(crate) const APPLICATION_TYPE: &str = "application";
pub(crate) const SHUTDOWN_OPERATION: &str = "shutdown-application";

/// Running state shared with the operations that control the application.
pub(crate) struct ApplicationHandle {
    name: String,
    running: Cell<bool>,
}

impl ApplicationHandle {
    pub(crate) fn new(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            running: Cell::new(true),
        })
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.get()
    }
}

impl DataObject for ApplicationHandle {
    fn type_name(&self) -> &str {
        APPLICATION_TYPE
    }

    fn type_description(&self) -> String {
        "Application".to_string()
    }

    fn describe(&self) -> String {
        self.name.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

struct ShutdownOperation {
    application: Rc<ApplicationHandle>,
}

impl Operation for ShutdownOperation {
    fn run(&self, context: &Rc<OperationContext>) -> AdminResult<OperationResponse> {
        info!(by = %context.executor().name(), "shutdown requested");
        self.application.running.set(false);
        Ok(OperationResponse::succeeded_with(format!(
            "Shutting down {}.",
            self.application.name
        )))
    }
}

pub(crate) fn shutdown(
    _context: &Rc<OperationContext>,
    storage: &Storage,
) -> AdminResult<Box<dyn Operation>> {
    let target = storage.get_and_assert(KEY_TARGET, &ValueType::named(APPLICATION_TYPE))?;
    let application = target
        .as_object()
        .and_then(downcast_object::<ApplicationHandle>)
        .ok_or_else(|| {
            AdminError::invalid_input(
                "INPUT_UNCONVERTIBLE",
                format!("{} is not an application.", target.type_and_value_description()),
            )
        })?;
    Ok(Box::new(ShutdownOperation { application }))
}
