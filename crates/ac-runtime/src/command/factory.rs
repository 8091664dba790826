//! Command trees declared in configuration.
//!
//! ```yaml
//! commands:
//!   user:
//!     admin: true
//!     sub-commands:
//!       rename:
//!         operation: rename-user
//!         arguments:
//!           name: { variable: target }
//!           new-name: { variable: name, optional: true }
//!     templates: [listing]
//!     template-variables: { registry: users }
//! ```

use std::rc::Rc;

use ac_core::{AdminError, AdminResult, DataValue, ValueType};
use tracing::{debug, info};

use super::{Command, CommandArgument, CommandDefinition};
use crate::config_template::text_entries;
use crate::module::OperationModule;
use crate::storage::Storage;

const KEY_COMMANDS: &str = "commands";
const KEY_SUB_COMMANDS: &str = "sub-commands";
const KEY_TEMPLATES: &str = "templates";
const KEY_TEMPLATE_VARIABLES: &str = "template-variables";
const KEY_ARGUMENTS: &str = "arguments";
const KEY_VARIABLES: &str = "variables";

/// Registers the command trees found under `commands` in `storage`.
pub fn register_commands(module: &OperationModule, storage: &Storage) -> AdminResult<usize> {
    register_command_nodes(module, storage).map_err(|error| error.with_action("registering commands"))
}

fn register_command_nodes(module: &OperationModule, storage: &Storage) -> AdminResult<usize> {
    let commands = storage.get_and_assert_storage(KEY_COMMANDS)?;
    let mut count = 0;
    for node in commands.nodes() {
        let command = create_command(module, &node)?;
        module.register_command(command)?;
        count += 1;
    }
    info!(count, "registered commands");
    Ok(count)
}

fn create_command(module: &OperationModule, node: &Storage) -> AdminResult<Rc<Command>> {
    expand_templates(module, node)?;

    let mut sub_commands = Vec::new();
    if let Some(children) = node.get_storage(KEY_SUB_COMMANDS, false) {
        for child in children.nodes() {
            sub_commands.push(create_command(module, &child)?);
        }
    }

    let mut arguments = Vec::new();
    if let Some(declared) = node.get_storage(KEY_ARGUMENTS, false) {
        for key in declared.keys() {
            let argument = declared.get_and_assert_storage(&key)?;
            arguments.push(create_argument(&argument)?);
        }
    }

    let variables = node
        .get_storage(KEY_VARIABLES, false)
        .map(|variables| text_entries(&variables.to_map_value()))
        .unwrap_or_default();

    let definition = CommandDefinition {
        key: node.storage_key().to_string(),
        admin: node.get_bool("admin").unwrap_or(false),
        root: node.get_bool("root").unwrap_or(false),
        operation: node.get_text("operation"),
        arguments,
        sub_commands,
        variables,
    };
    debug!(command = %definition.key, path = %node.storage_path(), "created command");
    Command::new(definition)
}

fn create_argument(node: &Storage) -> AdminResult<CommandArgument> {
    let variable = node.get_and_assert_text("variable")?;
    let description = node.storage_key();
    Ok(if node.get_bool("optional").unwrap_or(false) {
        CommandArgument::optional(description, &variable)
    } else {
        CommandArgument::required(description, &variable)
    })
}

/// Merges every listed configuration template, expanded with the
/// `template-variables`, into the `sub-commands` of `node`.
fn expand_templates(module: &OperationModule, node: &Storage) -> AdminResult<()> {
    if !node.is_set(KEY_TEMPLATES) {
        return Ok(());
    }
    let names = node.get_and_assert_collection(KEY_TEMPLATES, &ValueType::list(ValueType::Text), 0)?;
    let variables = node
        .get_map(
            KEY_TEMPLATE_VARIABLES,
            &ValueType::map(ValueType::Text, ValueType::Any),
            true,
        )
        .map(|variables| text_entries(&variables))
        .unwrap_or_default();
    for name in names.elements().unwrap_or_default() {
        let name = name.to_text();
        let Some(template) = module.configuration_template(&name) else {
            return Err(AdminError::construction(
                "TEMPLATE_NOT_FOUND",
                format!(
                    "Could not find configuration template '{}' specified at: {}.{}",
                    name,
                    node.storage_path(),
                    KEY_TEMPLATES
                ),
            ));
        };
        let expanded = template.expand(&variables);
        let entries = text_entries(&expanded);
        if entries.is_empty() {
            return Err(AdminError::construction(
                "TEMPLATE_EMPTY",
                format!("Configuration template '{}' expanded to nothing.", name),
            ));
        }
        let Some(sub_commands) = node.get_storage(KEY_SUB_COMMANDS, true) else {
            continue;
        };
        for (key, value) in entries {
            sub_commands.set(&key, value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod factory_tests {
    use super::*;
    use crate::config_template::register_configuration_templates;
    use crate::user::{Access, ApplicationUser};

    fn text_map(pairs: Vec<(&str, DataValue)>) -> DataValue {
        DataValue::text_map(
            pairs
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }

    fn storage(module: &OperationModule, value: DataValue) -> Storage {
        Storage::from_value(module.conversions().clone(), "", &value)
    }

    fn argument(variable: &str, optional: bool) -> DataValue {
        text_map(vec![
            ("variable", DataValue::from(variable)),
            ("optional", DataValue::Bool(optional)),
        ])
    }

    fn configuration() -> DataValue {
        let show = text_map(vec![
            ("operation", DataValue::from("info")),
            (
                "arguments",
                text_map(vec![("value", argument("target", false))]),
            ),
        ]);
        let limit = text_map(vec![
            ("operation", DataValue::from("string-length")),
            ("arguments", text_map(vec![("text", argument("target", false))])),
            ("variables", text_map(vec![("max-length", DataValue::Integer(4))])),
        ]);
        let tools = text_map(vec![
            ("admin", DataValue::from("yes")),
            (
                "sub-commands",
                text_map(vec![("show", show), ("limit", limit)]),
            ),
        ]);
        text_map(vec![("commands", text_map(vec![("tools", tools)]))])
    }

    #[test]
    fn commands_are_built_from_configuration() {
        let module = OperationModule::new();
        let count = register_commands(&module, &storage(&module, configuration())).expect("commands");
        assert_eq!(count, 1);
        let tools = module.command("tools").expect("tools");
        assert!(tools.is_admin());
        let limit = tools.sub_command("limit").expect("limit");
        assert_eq!(limit.usage(), "tools limit <text>");
        assert_eq!(limit.variables().get("max-length"), Some(&DataValue::Integer(4)));

        let admin = Rc::new(ApplicationUser::new("ops", Access::Admin));
        let response = module.execute_line(&admin, "tools limit abcdef");
        assert_eq!(response.messages, vec!["Input cannot be longer than 4 characters."]);
        let guest = Rc::new(ApplicationUser::new("guest", Access::Guest));
        assert!(!module.execute_line(&guest, "tools show x").succeeded);
    }

    #[test]
    fn templates_expand_into_sub_commands() {
        let module = OperationModule::new();
        let template = text_map(vec![
            (
                "defaults",
                text_map(vec![("operation", DataValue::from("info"))]),
            ),
            (
                "template",
                text_map(vec![(
                    "$name",
                    text_map(vec![
                        ("operation", DataValue::from("$operation")),
                        ("variables", text_map(vec![("target", DataValue::from("$target"))])),
                    ]),
                )]),
            ),
        ]);
        let templates = storage(&module, text_map(vec![("describe", template)]));
        assert_eq!(
            register_configuration_templates(&module, &templates).expect("templates"),
            1
        );

        let node = text_map(vec![
            ("templates", DataValue::list(vec![DataValue::from("describe")])),
            (
                "template-variables",
                text_map(vec![
                    ("name", DataValue::from("ops")),
                    ("target", DataValue::from(".operations")),
                ]),
            ),
        ]);
        let config = text_map(vec![("commands", text_map(vec![("list", node)]))]);
        register_commands(&module, &storage(&module, config)).expect("commands");

        let ops = module
            .command("list")
            .and_then(|list| list.sub_command("ops"))
            .expect("expanded sub-command");
        assert_eq!(ops.operation(), Some("info"));
        let response = module.execute_line(&Rc::new(ApplicationUser::console()), "list ops");
        assert_eq!(response.messages, vec!["Registry: Operations"]);
    }

    #[test]
    fn missing_templates_fail_loading() {
        let module = OperationModule::new();
        let node = text_map(vec![("templates", DataValue::from("absent"))]);
        let config = text_map(vec![("commands", text_map(vec![("list", node)]))]);
        let error = register_commands(&module, &storage(&module, config)).expect_err("missing");
        assert_eq!(error.code, "TEMPLATE_NOT_FOUND");
        assert!(error
            .message
            .contains("Could not find configuration template 'absent' specified at: commands.list.templates"));
        assert!(error.message.ends_with("(while registering commands)"));
    }

    #[test]
    fn argument_order_and_variables_are_validated() {
        let module = OperationModule::new();
        let node = text_map(vec![
            ("operation", DataValue::from("info")),
            (
                "arguments",
                text_map(vec![("first", argument("a", true)), ("second", argument("b", false))]),
            ),
        ]);
        let config = text_map(vec![("commands", text_map(vec![("bad", node)]))]);
        let error = register_commands(&module, &storage(&module, config)).expect_err("order");
        assert_eq!(error.code, "COMMAND_ARGUMENT_ORDER");

        let node = text_map(vec![(
            "arguments",
            text_map(vec![("first", text_map(vec![("optional", DataValue::Bool(true))]))]),
        )]);
        let config = text_map(vec![("commands", text_map(vec![("bad", node)]))]);
        let error = register_commands(&module, &storage(&module, config)).expect_err("variable");
        assert_eq!(error.code, "INPUT_MISSING");
    }

    #[test]
    fn commands_node_is_required() {
        let module = OperationModule::new();
        let error = register_commands(&module, &storage(&module, text_map(Vec::new())))
            .expect_err("commands");
        assert_eq!(error.code, "INPUT_MISSING");
    }
}
