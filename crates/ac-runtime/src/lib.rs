pub mod command;
pub mod compare;
pub mod config_template;
pub mod datapath;
pub mod module;
pub mod operation;
pub mod registry;
pub mod storage;
pub mod user;
pub mod variable;

pub use command::factory::register_commands;
pub use command::{
    ArgumentProvider, Command, CommandArgument, CommandDefinition, SimpleArgumentProvider,
    TargetProvider,
};
pub use compare::ComparisonOperator;
pub use config_template::{register_configuration_templates, ConfigurationTemplate};
pub use datapath::{CustomPathResolver, DataPath, PathReference, PathResolver};
pub use module::OperationModule;
pub use operation::factory::register_procedures;
pub use operation::{
    Operation, OperationContext, OperationResponse, OperationSettings, OperationTemplate,
    ProcedureTask,
};
pub use registry::{Registrable, Registration, Registry};
pub use storage::Storage;
pub use user::{Access, ApplicationUser};
pub use variable::Variable;
