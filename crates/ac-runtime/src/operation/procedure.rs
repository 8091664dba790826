use std::rc::Rc;

use ac_core::AdminResult;

use super::context::OperationContext;
use super::template::OperationTemplate;
use super::{Operation, OperationResponse};

/// One step of a configured procedure.
#[derive(Clone)]
pub enum ProcedureTask {
    Sequence(Vec<Rc<OperationTemplate>>),
    Conditional {
        condition: Box<ProcedureTask>,
        then: Box<ProcedureTask>,
        otherwise: Box<ProcedureTask>,
    },
}

impl ProcedureTask {
    pub fn sequence(templates: Vec<Rc<OperationTemplate>>) -> Self {
        Self::Sequence(templates)
    }

    pub fn conditional(condition: ProcedureTask, then: ProcedureTask, otherwise: ProcedureTask) -> Self {
        Self::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Sequences run each template in a nested scope. With `stop_on_failure`
    /// the first failure is returned and the rest is skipped. A conditional
    /// evaluates its condition that way and then runs one branch to the end.
    pub fn execute(&self, context: &Rc<OperationContext>, stop_on_failure: bool) -> OperationResponse {
        match self {
            Self::Sequence(templates) => {
                for template in templates {
                    let response = OperationContext::child(context, template.clone()).execute();
                    if stop_on_failure && !response.succeeded {
                        return response;
                    }
                }
                OperationResponse::succeeded()
            }
            Self::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if condition.execute(context, true).succeeded {
                    then.execute(context, false)
                } else {
                    otherwise.execute(context, false)
                }
            }
        }
    }
}

/// Runs every task in order regardless of their outcome.
pub(crate) struct ProcedureOperation {
    tasks: Vec<ProcedureTask>,
}

impl ProcedureOperation {
    pub(crate) fn new(tasks: Vec<ProcedureTask>) -> Self {
        Self { tasks }
    }
}

impl Operation for ProcedureOperation {
    fn run(&self, context: &Rc<OperationContext>) -> AdminResult<OperationResponse> {
        for task in &self.tasks {
            task.execute(context, false);
        }
        Ok(OperationResponse::succeeded())
    }
}

#[cfg(test)]
mod procedure_tests {
    use std::cell::RefCell;

    use indexmap::IndexMap;

    use super::*;
    use crate::module::OperationModule;
    use crate::operation::{ExecutionEnv, OperationConstructor};
    use crate::storage::Storage;
    use crate::user::ApplicationUser;

    thread_local! {
        static SEEN: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
    }

    struct Step {
        name: &'static str,
        succeeds: bool,
    }

    impl Operation for Step {
        fn run(&self, _context: &Rc<OperationContext>) -> AdminResult<OperationResponse> {
            SEEN.with(|seen| seen.borrow_mut().push(self.name));
            Ok(if self.succeeds {
                OperationResponse::succeeded()
            } else {
                OperationResponse::failed(format!("{} failed", self.name))
            })
        }
    }

    fn step_a(_context: &Rc<OperationContext>, _storage: &Storage) -> AdminResult<Box<dyn Operation>> {
        Ok(Box::new(Step { name: "A", succeeds: true }))
    }

    fn step_b(_context: &Rc<OperationContext>, _storage: &Storage) -> AdminResult<Box<dyn Operation>> {
        Ok(Box::new(Step { name: "B", succeeds: false }))
    }

    fn step_c(_context: &Rc<OperationContext>, _storage: &Storage) -> AdminResult<Box<dyn Operation>> {
        Ok(Box::new(Step { name: "C", succeeds: true }))
    }

    fn template(key: &str, constructor: OperationConstructor) -> Rc<OperationTemplate> {
        Rc::new(OperationTemplate::simple(key, &[], constructor))
    }

    fn seen() -> Vec<&'static str> {
        SEEN.with(|seen| seen.borrow_mut().drain(..).collect())
    }

    fn root(module: &OperationModule) -> Rc<OperationContext> {
        let env = ExecutionEnv::new(module.resolver().clone(), Rc::new(ApplicationUser::console()));
        OperationContext::root(env, template("root", step_a), IndexMap::new())
    }

    fn a_b_c() -> ProcedureTask {
        ProcedureTask::sequence(vec![
            template("a", step_a),
            template("b", step_b),
            template("c", step_c),
        ])
    }

    #[test]
    fn stop_on_failure_returns_the_failing_step() {
        let module = OperationModule::new();
        seen();
        let response = a_b_c().execute(&root(&module), true);
        assert_eq!(seen(), vec!["A", "B"]);
        assert!(!response.succeeded);
        assert_eq!(response.messages, vec!["B failed"]);
    }

    #[test]
    fn without_stop_every_step_runs_and_succeeds() {
        let module = OperationModule::new();
        seen();
        let response = a_b_c().execute(&root(&module), false);
        assert_eq!(seen(), vec!["A", "B", "C"]);
        assert!(response.succeeded);
        assert!(response.messages.is_empty());
    }

    #[test]
    fn failed_condition_runs_the_else_branch() {
        let module = OperationModule::new();
        let conditional = ProcedureTask::conditional(
            ProcedureTask::sequence(vec![template("b", step_b), template("a", step_a)]),
            ProcedureTask::sequence(vec![template("a", step_a)]),
            ProcedureTask::sequence(vec![template("c", step_c)]),
        );
        seen();
        assert!(conditional.execute(&root(&module), false).succeeded);
        assert_eq!(seen(), vec!["B", "C"]);
    }
}
