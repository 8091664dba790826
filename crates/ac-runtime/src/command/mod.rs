use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ac_core::{AdminError, AdminResult, DataHolder, DataObject, DataValue};
use indexmap::IndexMap;

use crate::operation::builtin::KEY_TARGET;
use crate::registry::{Registrable, RegistrationSlot};
use crate::user::ApplicationUser;

mod dispatch;
pub mod factory;

pub const COMMAND_TYPE: &str = "command";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgument {
    pub description: String,
    pub variable: String,
    pub optional: bool,
}

impl CommandArgument {
    pub fn required(description: &str, variable: &str) -> Self {
        Self {
            description: description.to_string(),
            variable: variable.to_string(),
            optional: false,
        }
    }

    pub fn optional(description: &str, variable: &str) -> Self {
        Self {
            optional: true,
            ..Self::required(description, variable)
        }
    }

    fn usage(&self) -> String {
        if self.optional {
            format!("[{}]", self.description)
        } else {
            format!("<{}>", self.description)
        }
    }
}

/// Adds arguments to a command invocation before its operation runs.
pub trait ArgumentProvider {
    fn provide(&self, command: &Command, arguments: &mut IndexMap<String, DataValue>);
}

/// Sets `key` unless the invocation already supplies it.
pub struct SimpleArgumentProvider {
    key: String,
    value: DataValue,
}

impl SimpleArgumentProvider {
    pub fn new(key: &str, value: DataValue) -> Self {
        Self {
            key: key.to_string(),
            value,
        }
    }
}

impl ArgumentProvider for SimpleArgumentProvider {
    fn provide(&self, _command: &Command, arguments: &mut IndexMap<String, DataValue>) {
        arguments
            .entry(self.key.clone())
            .or_insert_with(|| self.value.clone());
    }
}

/// Always points `target` at a fixed value.
pub struct TargetProvider {
    target: DataValue,
}

impl TargetProvider {
    pub fn new(target: DataValue) -> Self {
        Self { target }
    }
}

impl ArgumentProvider for TargetProvider {
    fn provide(&self, _command: &Command, arguments: &mut IndexMap<String, DataValue>) {
        arguments.insert(KEY_TARGET.to_string(), self.target.clone());
    }
}

#[derive(Default)]
pub struct CommandDefinition {
    pub key: String,
    pub admin: bool,
    pub root: bool,
    pub operation: Option<String>,
    pub arguments: Vec<CommandArgument>,
    pub sub_commands: Vec<Rc<Command>>,
    pub variables: IndexMap<String, DataValue>,
}

/// Node of the command tree: a keyword, optionally bound to an operation
/// with positional arguments, optionally with sub-commands.
pub struct Command {
    key: String,
    admin: bool,
    root: bool,
    operation: Option<String>,
    arguments: Vec<CommandArgument>,
    sub_commands: IndexMap<String, Rc<Command>>,
    variables: IndexMap<String, DataValue>,
    parent: RefCell<Weak<Command>>,
    providers: RefCell<Vec<Rc<dyn ArgumentProvider>>>,
    registration: RegistrationSlot,
}

impl Command {
    /// Required arguments must all come before the first optional one.
    pub fn new(definition: CommandDefinition) -> AdminResult<Rc<Self>> {
        let mut seen_optional = false;
        for argument in &definition.arguments {
            if seen_optional && !argument.optional {
                return Err(AdminError::construction(
                    "COMMAND_ARGUMENT_ORDER",
                    format!(
                        "Argument '{}' of command {} was not declared as optional, but it was preceded by an optional argument.",
                        argument.description, definition.key
                    ),
                ));
            }
            seen_optional |= argument.optional;
        }
        let sub_commands: IndexMap<String, Rc<Command>> = definition
            .sub_commands
            .into_iter()
            .map(|command| (command.key.clone(), command))
            .collect();
        let command = Rc::new(Self {
            key: definition.key,
            admin: definition.admin,
            root: definition.root,
            operation: definition.operation,
            arguments: definition.arguments,
            sub_commands,
            variables: definition.variables,
            parent: RefCell::new(Weak::new()),
            providers: RefCell::new(Vec::new()),
            registration: RegistrationSlot::default(),
        });
        for child in command.sub_commands.values() {
            *child.parent.borrow_mut() = Rc::downgrade(&command);
        }
        Ok(command)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub fn arguments(&self) -> &[CommandArgument] {
        &self.arguments
    }

    pub fn variables(&self) -> &IndexMap<String, DataValue> {
        &self.variables
    }

    pub fn parent(&self) -> Option<Rc<Command>> {
        self.parent.borrow().upgrade()
    }

    pub fn sub_commands(&self) -> impl Iterator<Item = &Rc<Command>> {
        self.sub_commands.values()
    }

    pub fn has_sub_commands(&self) -> bool {
        !self.sub_commands.is_empty()
    }

    pub fn sub_command(&self, key: &str) -> Option<Rc<Command>> {
        self.sub_commands.get(key).cloned().or_else(|| {
            self.sub_commands
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, command)| command.clone())
        })
    }

    pub fn required_argument_count(&self) -> usize {
        self.arguments
            .iter()
            .position(|argument| argument.optional)
            .unwrap_or(self.arguments.len())
    }

    pub fn add_provider(&self, provider: Rc<dyn ArgumentProvider>) {
        self.providers.borrow_mut().push(provider);
    }

    pub(crate) fn providers(&self) -> Vec<Rc<dyn ArgumentProvider>> {
        self.providers.borrow().clone()
    }

    pub fn can_execute(&self, user: &ApplicationUser) -> bool {
        if self.root {
            user.has_root_access()
        } else if self.admin {
            user.has_admin_access()
        } else {
            true
        }
    }

    /// Keywords of the ancestors, this command and its argument
    /// placeholders, e.g. `user add <name> [age]`.
    pub fn usage(&self) -> String {
        let mut parts = match self.parent() {
            Some(parent) => vec![parent.key_path()],
            None => Vec::new(),
        };
        parts.push(self.key.clone());
        parts.extend(self.arguments.iter().map(CommandArgument::usage));
        parts.join(" ")
    }

    fn key_path(&self) -> String {
        match self.parent() {
            Some(parent) => format!("{} {}", parent.key_path(), self.key),
            None => self.key.clone(),
        }
    }
}

impl DataHolder for Command {
    fn get_value(&self, key: &DataValue) -> Option<DataValue> {
        self.sub_command(&key.to_text())
            .map(|command| DataValue::object(command))
    }

    fn convert_key(&self, text: &str) -> Option<DataValue> {
        self.sub_command(text)
            .map(|command| DataValue::from(command.key.clone()))
    }

    fn contents(&self) -> IndexMap<String, DataValue> {
        self.sub_commands
            .iter()
            .map(|(key, command)| (key.clone(), DataValue::object(command.clone())))
            .collect()
    }

    fn value_description(&self) -> String {
        "Command".to_string()
    }
}

impl DataObject for Command {
    fn type_name(&self) -> &str {
        COMMAND_TYPE
    }

    fn type_description(&self) -> String {
        "Command".to_string()
    }

    fn describe(&self) -> String {
        self.usage()
    }

    fn as_holder(&self) -> Option<&dyn DataHolder> {
        Some(self)
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

impl Registrable for Command {
    fn registry_key(&self) -> String {
        self.key.clone()
    }

    fn registration(&self) -> &RegistrationSlot {
        &self.registration
    }
}

#[cfg(test)]
mod command_tests {
    use super::*;
    use crate::user::Access;

    fn user_command() -> Rc<Command> {
        let add = Command::new(CommandDefinition {
            key: "add".to_string(),
            operation: Some("add-user".to_string()),
            arguments: vec![
                CommandArgument::required("name", "user"),
                CommandArgument::optional("age", "age"),
            ],
            ..CommandDefinition::default()
        })
        .expect("add");
        Command::new(CommandDefinition {
            key: "user".to_string(),
            admin: true,
            sub_commands: vec![add],
            ..CommandDefinition::default()
        })
        .expect("user")
    }

    #[test]
    fn usage_lists_ancestors_and_arguments() {
        let user = user_command();
        let add = user.sub_command("ADD").expect("case insensitive");
        assert_eq!(add.usage(), "user add <name> [age]");
        assert_eq!(add.required_argument_count(), 1);
        assert_eq!(add.parent().expect("parent").key(), "user");
        assert_eq!(user.usage(), "user");
    }

    #[test]
    fn required_arguments_cannot_follow_optional_ones() {
        let error = Command::new(CommandDefinition {
            key: "bad".to_string(),
            arguments: vec![
                CommandArgument::optional("first", "a"),
                CommandArgument::required("second", "b"),
            ],
            ..CommandDefinition::default()
        })
        .err()
        .expect("order");
        assert_eq!(error.code, "COMMAND_ARGUMENT_ORDER");
    }

    #[test]
    fn access_follows_flags() {
        let user = user_command();
        assert!(!user.can_execute(&ApplicationUser::new("guest", Access::Guest)));
        assert!(user.can_execute(&ApplicationUser::new("ops", Access::Admin)));
        let add = user.sub_command("add").expect("add");
        assert!(add.can_execute(&ApplicationUser::new("guest", Access::Guest)));
    }

    #[test]
    fn providers_fill_arguments() {
        let user = user_command();
        let mut arguments = IndexMap::new();
        arguments.insert("mode".to_string(), DataValue::from("given"));
        SimpleArgumentProvider::new("mode", DataValue::from("default")).provide(&user, &mut arguments);
        SimpleArgumentProvider::new("limit", DataValue::Integer(3)).provide(&user, &mut arguments);
        TargetProvider::new(DataValue::from("x")).provide(&user, &mut arguments);
        assert_eq!(arguments.get("mode"), Some(&DataValue::from("given")));
        assert_eq!(arguments.get("limit"), Some(&DataValue::Integer(3)));
        assert_eq!(arguments.get("target"), Some(&DataValue::from("x")));
    }
}
