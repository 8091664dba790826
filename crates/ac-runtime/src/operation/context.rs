use std::rc::Rc;

use ac_convert::ConversionEngine;
use ac_core::{AdminError, AdminResult, DataValue};
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::template::OperationTemplate;
use super::{OperationResponse, OperationSettings, KEY_EXECUTOR, KEY_OPERATION_NAME};
use crate::datapath::PathResolver;
use crate::storage::Storage;
use crate::user::ApplicationUser;

const MAX_DEPTH: usize = 64;

/// Shared by every context of one top-level execution.
pub struct ExecutionEnv {
    resolver: Rc<PathResolver>,
    executor: Rc<ApplicationUser>,
}

impl ExecutionEnv {
    pub fn new(resolver: Rc<PathResolver>, executor: Rc<ApplicationUser>) -> Rc<Self> {
        Rc::new(Self { resolver, executor })
    }
}

/// One running operation: its template, its variable scope and the context
/// that started it.
pub struct OperationContext {
    parent: Option<Rc<OperationContext>>,
    template: Rc<OperationTemplate>,
    env: Rc<ExecutionEnv>,
    storage: Storage,
    depth: usize,
}

impl OperationContext {
    /// Top-level context; `arguments` seed its scope.
    pub fn root(
        env: Rc<ExecutionEnv>,
        template: Rc<OperationTemplate>,
        arguments: IndexMap<String, DataValue>,
    ) -> Rc<Self> {
        let storage = Storage::new(env.resolver.conversions().clone());
        storage.set_all(arguments);
        Rc::new(Self {
            parent: None,
            template,
            env,
            storage,
            depth: 0,
        })
    }

    pub fn child(parent: &Rc<Self>, template: Rc<OperationTemplate>) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(parent.clone()),
            template,
            env: parent.env.clone(),
            storage: Storage::new(parent.conversions().clone()),
            depth: parent.depth + 1,
        })
    }

    pub fn parent(&self) -> Option<&Rc<OperationContext>> {
        self.parent.as_ref()
    }

    pub fn template(&self) -> &Rc<OperationTemplate> {
        &self.template
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Scope variables are inherited from. The root context inherits from
    /// its own, argument-seeded scope.
    pub fn parent_storage(&self) -> &Storage {
        match &self.parent {
            Some(parent) => parent.storage(),
            None => &self.storage,
        }
    }

    pub fn resolver(&self) -> &Rc<PathResolver> {
        &self.env.resolver
    }

    pub fn conversions(&self) -> &Rc<ConversionEngine> {
        self.env.resolver.conversions()
    }

    pub fn executor(&self) -> &Rc<ApplicationUser> {
        &self.env.executor
    }

    /// Template keys from the top-level operation down to this one.
    pub fn trail(&self) -> Vec<String> {
        let mut trail = match &self.parent {
            Some(parent) => parent.trail(),
            None => Vec::new(),
        };
        trail.push(self.template.key().to_string());
        trail
    }

    /// Runs the operation. Invalid input becomes a failed response carrying
    /// its message; anything else is logged and reported generically.
    pub fn execute(self: &Rc<Self>) -> OperationResponse {
        match self.try_execute() {
            Ok(response) => response,
            Err(error) if error.is_invalid_input() => OperationResponse::failed(format!(
                "An error occurred when executing this operation: {}",
                error.message
            )),
            Err(error) => {
                warn!(
                    operation = %self.template.key(),
                    trail = %self.trail().join(" > "),
                    code = %error.code,
                    message = %error.message,
                    "operation failed unexpectedly"
                );
                OperationResponse::failed("An unknown error occurred when executing this operation.")
            }
        }
    }

    fn try_execute(self: &Rc<Self>) -> AdminResult<OperationResponse> {
        if self.depth > MAX_DEPTH {
            return Err(AdminError::invalid_input(
                "OPERATION_TOO_DEEP",
                format!(
                    "Operations are nested more than {} levels deep: {}",
                    MAX_DEPTH,
                    self.template.key()
                ),
            ));
        }
        debug!(operation = %self.template.key(), depth = self.depth, "executing operation");
        let parent_storage = self.parent_storage();
        for variable in self.template.variables() {
            variable.map_into(parent_storage, &self.storage, &self.env.resolver);
        }
        self.storage
            .set(KEY_EXECUTOR, DataValue::object(self.env.executor.clone()));
        self.storage
            .set(KEY_OPERATION_NAME, DataValue::from(self.template.key()));

        let settings = OperationSettings::from_storage(&self.storage)?;
        let operation = self.template.instantiate(self, &self.storage)?;
        let response = operation.run(self)?;
        Ok(settings.apply(response))
    }
}
