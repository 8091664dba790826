use std::rc::Rc;

use ac_core::DataValue;
use indexmap::IndexMap;
use tracing::debug;

use super::Command;
use crate::module::OperationModule;
use crate::operation::builtin::KEY_TARGET;
use crate::operation::OperationResponse;
use crate::user::ApplicationUser;

const OPERATION_COMMAND: &str = "operation";
const HELP_COMMAND: &str = "help";
const NOT_ALLOWED: &str = "You are not allowed to use this command.";

impl OperationModule {
    /// Dispatches a tokenized console line: `operation <name> [k=v]...`,
    /// `help [filter]...` or a registered command followed by its sub-command
    /// keywords and arguments.
    pub fn execute_command(&self, user: &Rc<ApplicationUser>, tokens: &[String]) -> OperationResponse {
        let Some((first, rest)) = tokens.split_first() else {
            return OperationResponse::failed("Empty command given.");
        };
        debug!(command = %first, arguments = rest.len(), user = %user.name(), "dispatching command");
        if first.eq_ignore_ascii_case(OPERATION_COMMAND) {
            return self.execute_operation_command(user, rest);
        }
        if first.eq_ignore_ascii_case(HELP_COMMAND) {
            return self.execute_help(user, rest);
        }
        match self.command(first) {
            Some(command) => self.execute_command_tree(user, command, rest),
            None => OperationResponse::failed(format!("Unknown command: {}", first)),
        }
    }

    fn execute_operation_command(&self, user: &Rc<ApplicationUser>, tokens: &[String]) -> OperationResponse {
        if !user.has_root_access() {
            return OperationResponse::failed(NOT_ALLOWED);
        }
        let Some((name, mappings)) = tokens.split_first() else {
            return OperationResponse::failed(
                "You must provide an operation to perform. Use: operation <operation> [key=value] [key=value] [key=value]...",
            );
        };
        let mut arguments = IndexMap::new();
        for mapping in mappings {
            match parse_mapping(mapping) {
                Some((key, value)) => {
                    arguments.insert(key.to_string(), DataValue::from(value));
                }
                None => {
                    return OperationResponse::failed(format!(
                        "Incorrect variable mapping: {}. Mapping should be: 'key=value'.",
                        mapping
                    ))
                }
            }
        }
        self.execute_named_operation(user, name, arguments)
    }

    fn execute_help(&self, user: &Rc<ApplicationUser>, filters: &[String]) -> OperationResponse {
        let mut arguments = IndexMap::new();
        arguments.insert(KEY_TARGET.to_string(), DataValue::from(".commands"));
        if !filters.is_empty() {
            let filters = filters.iter().map(|filter| DataValue::from(filter.as_str())).collect();
            arguments.insert("key-filters".to_string(), DataValue::list(filters));
        }
        self.execute_named_operation(user, "data-info", arguments)
    }

    fn execute_command_tree(
        &self,
        user: &Rc<ApplicationUser>,
        mut command: Rc<Command>,
        mut tokens: &[String],
    ) -> OperationResponse {
        if !command.can_execute(user) {
            return OperationResponse::failed(NOT_ALLOWED);
        }
        while let Some((next, rest)) = tokens.split_first() {
            let Some(sub_command) = command.sub_command(next) else {
                break;
            };
            if !sub_command.can_execute(user) {
                return OperationResponse::failed(NOT_ALLOWED);
            }
            command = sub_command;
            tokens = rest;
        }

        let Some(operation) = command.operation().map(str::to_string) else {
            if !command.has_sub_commands() {
                return OperationResponse::failed("Misconfigured command.");
            }
            return OperationResponse::succeeded_with("Use:")
                .with_messages(command.sub_commands().map(|sub_command| sub_command.usage()));
        };

        // Tokens beyond the declared arguments are ignored.
        if tokens.len() < command.required_argument_count() {
            return OperationResponse::failed(format!("Incorrect argument count. Use: {}", command.usage()));
        }
        let arguments = match Self::bind_arguments(&command, tokens) {
            Ok(arguments) => arguments,
            Err(message) => return OperationResponse::failed(message),
        };
        match self.operation(&operation) {
            Some(template) => self.execute_operation(user, template, arguments),
            None => OperationResponse::failed(format!("Could not find operation: {}", operation)),
        }
    }

    /// Positional tokens first, then providers, then the command's fixed
    /// variables.
    fn bind_arguments(command: &Command, tokens: &[String]) -> Result<IndexMap<String, DataValue>, String> {
        let mut arguments: IndexMap<String, DataValue> = IndexMap::new();
        for (argument, token) in command.arguments().iter().zip(tokens) {
            let value = DataValue::from(token.as_str());
            match arguments.get(&argument.variable).cloned() {
                None => {
                    arguments.insert(argument.variable.clone(), value);
                }
                Some(existing) => {
                    let accumulated = accumulate(existing, value).ok_or_else(|| {
                        format!(
                            "Argument {} cannot be combined with the other values of {}.",
                            argument.description, argument.variable
                        )
                    })?;
                    arguments.insert(argument.variable.clone(), accumulated);
                }
            }
        }
        for provider in command.providers() {
            provider.provide(command, &mut arguments);
        }
        for (key, value) in command.variables() {
            arguments.insert(key.clone(), value.clone());
        }
        Ok(arguments)
    }
}

/// Appends `value` to the sequence already bound to a variable. Elements
/// must share one type.
fn accumulate(existing: DataValue, value: DataValue) -> Option<DataValue> {
    let mut elements = match existing.as_list() {
        Some(list) => list.borrow().clone(),
        None => vec![existing],
    };
    if elements.iter().any(|element| element.type_key() != value.type_key()) {
        return None;
    }
    elements.push(value);
    Some(DataValue::list(elements))
}

fn parse_mapping(mapping: &str) -> Option<(&str, &str)> {
    let (key, value) = mapping.split_once('=')?;
    if key.is_empty() || value.contains('=') {
        return None;
    }
    Some((key, value))
}
