use std::any::Any;
use std::rc::Rc;

use ac_core::{AdminResult, DataObject, DataValue};

use super::context::OperationContext;
use super::procedure::{ProcedureOperation, ProcedureTask};
use super::{Operation, OperationResponse, COMMON_VARIABLES};
use crate::registry::{Registrable, RegistrationSlot};
use crate::storage::Storage;
use crate::variable::Variable;

pub const OPERATION_TEMPLATE_TYPE: &str = "operation-template";

pub type OperationConstructor =
    fn(&Rc<OperationContext>, &Storage) -> AdminResult<Box<dyn Operation>>;

pub enum TemplateKind {
    /// A built-in operation.
    Simple(OperationConstructor),
    /// Runs another template in a nested scope and passes its response on.
    Wrapped(Rc<OperationTemplate>),
    Procedure(Vec<ProcedureTask>),
}

/// Registered, named recipe for creating operations.
pub struct OperationTemplate {
    key: String,
    variables: Vec<Variable>,
    kind: TemplateKind,
    registration: RegistrationSlot,
}

impl OperationTemplate {
    /// Built-in operation reading `variables` plus the common response
    /// settings from its scope.
    pub fn simple(key: &str, variables: &[&str], constructor: OperationConstructor) -> Self {
        let variables = COMMON_VARIABLES
            .iter()
            .chain(variables)
            .map(|name| Variable::declared(*name))
            .collect();
        Self::with_kind(key, variables, TemplateKind::Simple(constructor))
    }

    pub fn wrapped(key: &str, variables: Vec<Variable>, inner: Rc<OperationTemplate>) -> Self {
        Self::with_kind(key, variables, TemplateKind::Wrapped(inner))
    }

    pub fn procedure(key: &str, variables: Vec<Variable>, tasks: Vec<ProcedureTask>) -> Self {
        Self::with_kind(key, variables, TemplateKind::Procedure(tasks))
    }

    fn with_kind(key: &str, variables: Vec<Variable>, kind: TemplateKind) -> Self {
        Self {
            key: key.to_string(),
            variables,
            kind,
            registration: RegistrationSlot::default(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn kind(&self) -> &TemplateKind {
        &self.kind
    }

    pub fn instantiate(
        &self,
        context: &Rc<OperationContext>,
        storage: &Storage,
    ) -> AdminResult<Box<dyn Operation>> {
        match &self.kind {
            TemplateKind::Simple(constructor) => constructor(context, storage),
            TemplateKind::Wrapped(inner) => Ok(Box::new(WrappedOperation {
                inner: inner.clone(),
            })),
            TemplateKind::Procedure(tasks) => Ok(Box::new(ProcedureOperation::new(tasks.clone()))),
        }
    }
}

struct WrappedOperation {
    inner: Rc<OperationTemplate>,
}

impl Operation for WrappedOperation {
    fn run(&self, context: &Rc<OperationContext>) -> AdminResult<OperationResponse> {
        Ok(OperationContext::child(context, self.inner.clone()).execute())
    }
}

impl DataObject for OperationTemplate {
    fn type_name(&self) -> &str {
        OPERATION_TEMPLATE_TYPE
    }

    fn type_description(&self) -> String {
        "Operation".to_string()
    }

    fn describe(&self) -> String {
        self.key.clone()
    }

    fn reference(&self) -> Option<DataValue> {
        self.registration.reference()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl Registrable for OperationTemplate {
    fn registry_key(&self) -> String {
        self.key.clone()
    }

    fn registration(&self) -> &RegistrationSlot {
        &self.registration
    }
}
