use std::rc::Rc;

use ac_convert::ConversionEngine;
use ac_core::text::tokenize_command_line;
use ac_core::{AdminError, AdminResult, DataValue};
use indexmap::IndexMap;
use tracing::debug;

use crate::command::{ArgumentProvider, Command, COMMAND_TYPE};
use crate::compare::install_comparison_operator;
use crate::config_template::{ConfigurationTemplate, CONFIGURATION_TEMPLATE_TYPE};
use crate::datapath::PathResolver;
use crate::operation::builtin::builtin_templates;
use crate::operation::{
    ExecutionEnv, OperationContext, OperationResponse, OperationTemplate, OPERATION_TEMPLATE_TYPE,
};
use crate::registry::Registry;
use crate::user::ApplicationUser;

/// Owns the conversion engine, the data root and the operation, command and
/// configuration template registries.
pub struct OperationModule {
    conversions: Rc<ConversionEngine>,
    resolver: Rc<PathResolver>,
    root: Rc<Registry>,
    operations: Rc<Registry>,
    commands: Rc<Registry>,
    templates: Rc<Registry>,
}

impl Default for OperationModule {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationModule {
    pub fn new() -> Self {
        Self::with_conversions(Rc::new(ConversionEngine::new()))
    }

    pub fn with_conversions(conversions: Rc<ConversionEngine>) -> Self {
        install_comparison_operator(&conversions);
        let resolver = PathResolver::new(conversions.clone());
        let root = Registry::root(&resolver);
        let operations = Registry::new(
            conversions.clone(),
            "operations",
            OPERATION_TEMPLATE_TYPE,
            "Operation",
            "Operations",
        );
        let commands = Registry::new(conversions.clone(), "commands", COMMAND_TYPE, "Command", "Commands");
        let templates = Registry::new(
            conversions.clone(),
            "configuration-templates",
            CONFIGURATION_TEMPLATE_TYPE,
            "Configuration Template",
            "Configuration Templates",
        );
        for registry in [&operations, &commands, &templates] {
            root.register(registry.clone());
        }
        for template in builtin_templates() {
            operations.register(Rc::new(template));
        }
        debug!(operations = operations.len(), "operation module ready");
        Self {
            conversions,
            resolver,
            root,
            operations,
            commands,
            templates,
        }
    }

    pub fn conversions(&self) -> &Rc<ConversionEngine> {
        &self.conversions
    }

    pub fn resolver(&self) -> &Rc<PathResolver> {
        &self.resolver
    }

    pub fn root_registry(&self) -> &Rc<Registry> {
        &self.root
    }

    pub fn operations(&self) -> &Rc<Registry> {
        &self.operations
    }

    pub fn commands(&self) -> &Rc<Registry> {
        &self.commands
    }

    pub fn configuration_templates(&self) -> &Rc<Registry> {
        &self.templates
    }

    /// Looks an operation up by key or description, case-insensitively.
    pub fn operation(&self, name: &str) -> Option<Rc<OperationTemplate>> {
        self.operations.get_object(name)
    }

    /// Top-level command by keyword, case-insensitively.
    pub fn command(&self, name: &str) -> Option<Rc<Command>> {
        self.commands.get_object(name).or_else(|| {
            let key = self
                .commands
                .keys()
                .into_iter()
                .find(|key| key.eq_ignore_ascii_case(name))?;
            self.commands.get_object(&key)
        })
    }

    pub fn configuration_template(&self, name: &str) -> Option<Rc<ConfigurationTemplate>> {
        self.templates.get_object(name)
    }

    pub fn register_operation(&self, template: OperationTemplate) -> AdminResult<Rc<OperationTemplate>> {
        let template = Rc::new(template);
        if !self.operations.register(template.clone()) {
            return Err(AdminError::construction(
                "TEMPLATE_DUPLICATE",
                format!(
                    "An operation called {} is already registered under that name.",
                    template.key()
                ),
            ));
        }
        Ok(template)
    }

    pub fn register_command(&self, command: Rc<Command>) -> AdminResult<()> {
        let key = command.key().to_string();
        if !self.commands.register(command) {
            return Err(AdminError::construction(
                "COMMAND_DUPLICATE",
                format!("A command called {} is already registered under that name.", key),
            ));
        }
        Ok(())
    }

    pub fn register_configuration_template(&self, template: ConfigurationTemplate) -> bool {
        self.templates.register(Rc::new(template))
    }

    /// Attaches `provider` to the command at `path`, e.g. `["user", "add"]`.
    pub fn register_argument_provider(&self, provider: Rc<dyn ArgumentProvider>, path: &[&str]) -> bool {
        let Some((first, rest)) = path.split_first() else {
            return false;
        };
        let mut command = match self.command(first) {
            Some(command) => command,
            None => return false,
        };
        for key in rest {
            command = match command.sub_command(key) {
                Some(sub_command) => sub_command,
                None => return false,
            };
        }
        command.add_provider(provider);
        true
    }

    pub fn execute_operation(
        &self,
        user: &Rc<ApplicationUser>,
        template: Rc<OperationTemplate>,
        arguments: IndexMap<String, DataValue>,
    ) -> OperationResponse {
        let env = ExecutionEnv::new(self.resolver.clone(), user.clone());
        OperationContext::root(env, template, arguments).execute()
    }

    pub fn execute_named_operation(
        &self,
        user: &Rc<ApplicationUser>,
        name: &str,
        arguments: IndexMap<String, DataValue>,
    ) -> OperationResponse {
        match self.operation(name) {
            Some(template) => self.execute_operation(user, template, arguments),
            None => OperationResponse::failed(format!("Could not find operation: {}", name)),
        }
    }

    /// Tokenizes a console line and dispatches it.
    pub fn execute_line(&self, user: &Rc<ApplicationUser>, line: &str) -> OperationResponse {
        self.execute_command(user, &tokenize_command_line(line))
    }
}
