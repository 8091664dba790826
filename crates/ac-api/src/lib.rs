use std::rc::Rc;

use ac_config::{overlay, parse_tree, ApplicationSettings, ConfigDirectory, ConfigFormat};
use ac_core::{AdminError, AdminResult, DataKey, DataValue};
use ac_runtime::operation::builtin::KEY_TARGET;
use ac_runtime::{
    register_commands, register_configuration_templates, register_procedures, ApplicationUser,
    OperationModule, OperationResponse, OperationTemplate, Storage, TargetProvider,
};
use indexmap::IndexMap;
use tracing::info;

mod lifecycle;

use lifecycle::{ApplicationHandle, SHUTDOWN_OPERATION};

/// Commands every application offers; configured commands of the same name
/// replace them.
const BUILTIN_COMMANDS: &str = r#"
commands:
  quit:
    root: true
    operation: shutdown-application
"#;

#[derive(Clone, Default)]
pub struct ApplicationOptions {
    pub commands: Option<DataValue>,
    pub procedures: Option<DataValue>,
    pub templates: Option<DataValue>,
    pub settings: ApplicationSettings,
}

impl From<ConfigDirectory> for ApplicationOptions {
    fn from(directory: ConfigDirectory) -> Self {
        Self {
            commands: directory.commands,
            procedures: directory.procedures,
            templates: directory.templates,
            settings: directory.settings,
        }
    }
}

/// What an application registered while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub templates: usize,
    pub procedures: usize,
    pub commands: usize,
    pub operations: usize,
}

pub struct Application {
    module: OperationModule,
    settings: ApplicationSettings,
    console: Rc<ApplicationUser>,
    handle: Rc<ApplicationHandle>,
    summary: LoadSummary,
}

impl Application {
    pub fn module(&self) -> &OperationModule {
        &self.module
    }

    pub fn settings(&self) -> &ApplicationSettings {
        &self.settings
    }

    pub fn console_user(&self) -> &Rc<ApplicationUser> {
        &self.console
    }

    pub fn summary(&self) -> LoadSummary {
        self.summary
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// Runs a console line as the console user.
    pub fn execute_line(&self, line: &str) -> OperationResponse {
        self.module.execute_line(&self.console, line)
    }

    /// Runs a console line as one of the configured users.
    pub fn execute_line_as(&self, user: &str, line: &str) -> AdminResult<OperationResponse> {
        let user = self.settings.user(user).ok_or_else(|| {
            AdminError::dispatch("API_UNKNOWN_USER", format!("Unknown user: {}", user))
        })?;
        Ok(self.module.execute_line(&Rc::new(user), line))
    }
}

/// Builds the operation module and registers, in order, configuration
/// templates, procedures and commands.
pub fn create_application(options: ApplicationOptions) -> AdminResult<Application> {
    let module = OperationModule::new();
    let handle = ApplicationHandle::new(&options.settings.console_name);
    module.register_operation(OperationTemplate::simple(
        SHUTDOWN_OPERATION,
        &[KEY_TARGET],
        lifecycle::shutdown,
    ))?;

    let storage = |tree: &DataValue| Storage::from_value(module.conversions().clone(), "", tree);
    let templates = match &options.templates {
        Some(tree) => register_configuration_templates(&module, &storage(tree))?,
        None => 0,
    };
    let procedures = match &options.procedures {
        Some(tree) => register_procedures(&module, &storage(tree))?,
        None => 0,
    };
    let commands = register_commands(&module, &storage(&merged_commands(options.commands.as_ref())?))?;
    module.register_argument_provider(
        Rc::new(TargetProvider::new(DataValue::object(handle.clone()))),
        &["quit"],
    );

    let summary = LoadSummary {
        templates,
        procedures,
        commands,
        operations: module.operations().len(),
    };
    info!(?summary, "application ready");
    Ok(Application {
        module,
        console: Rc::new(options.settings.console_user()),
        settings: options.settings,
        handle,
        summary,
    })
}

/// Built-in commands overlaid with the configured ones, command by command.
fn merged_commands(configured: Option<&DataValue>) -> AdminResult<DataValue> {
    let builtin = parse_tree(BUILTIN_COMMANDS, ConfigFormat::Yaml)?;
    let Some(configured) = configured else {
        return Ok(builtin);
    };
    let merged = overlay(&commands_node(&builtin), &commands_node(configured));
    Ok(DataValue::text_map(IndexMap::from([("commands".to_string(), merged)])))
}

fn commands_node(tree: &DataValue) -> DataValue {
    tree.as_map()
        .and_then(|map| map.borrow().get(&DataKey::text("commands")).cloned())
        .unwrap_or_else(|| DataValue::text_map(IndexMap::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(yaml: &str) -> Option<DataValue> {
        Some(parse_tree(yaml, ConfigFormat::Yaml).expect("yaml"))
    }

    fn options() -> ApplicationOptions {
        ApplicationOptions {
            commands: tree(
                r#"
commands:
  check:
    operation: check-name
    arguments:
      name: { variable: target }
  list:
    templates: [inspect]
    template-variables: { name: ops, target: .operations }
"#,
            ),
            procedures: tree(
                r#"
check-name:
  variables: { name: $target }
  operations:
    short: { type: string-length, variables: { target: $name, max-length: 5 } }
"#,
            ),
            templates: tree(
                r#"
inspect:
  template:
    $name: { operation: info, variables: { target: $target } }
"#,
            ),
            settings: ApplicationSettings::parse(
                "console-name: ops\nusers: [{ name: ann, access: admin }, { name: bo }]\n",
                ConfigFormat::Yaml,
            )
            .expect("settings"),
        }
    }

    #[test]
    fn create_application_loads_every_tree() {
        let application = create_application(options()).expect("application");
        let summary = application.summary();
        assert_eq!(summary.templates, 1);
        assert_eq!(summary.procedures, 1);
        assert_eq!(summary.commands, 3);
        assert_eq!(summary.operations, 15);
        assert_eq!(application.console_user().name(), "ops");

        let response = application.execute_line("list ops");
        assert_eq!(response.messages, vec!["Registry: Operations"]);
        assert!(application.execute_line("check bob").succeeded);
    }

    #[test]
    fn quit_stops_the_application() {
        let application = create_application(ApplicationOptions::default()).expect("application");
        assert!(application.is_running());
        let guest = application.execute_line_as("bo", "quit");
        assert!(guest.is_err());

        let response = application.execute_line("quit");
        assert!(response.succeeded);
        assert_eq!(response.messages, vec!["Shutting down console."]);
        assert!(!application.is_running());
    }

    #[test]
    fn users_dispatch_with_their_access() {
        let application = create_application(options()).expect("application");
        let response = application.execute_line_as("bo", "quit").expect("bo");
        assert_eq!(response.messages, vec!["You are not allowed to use this command."]);
        assert!(application.is_running());
        let error = application.execute_line_as("nobody", "help").expect_err("unknown");
        assert_eq!(error.code, "API_UNKNOWN_USER");
    }

    #[test]
    fn configured_commands_replace_builtins() {
        let mut options = options();
        options.commands = tree("commands:\n  quit: { operation: info }\n");
        let application = create_application(options).expect("application");
        let response = application.execute_line("quit");
        assert_eq!(response.messages, vec!["Application: ops"]);
        assert!(application.is_running());
    }

    #[test]
    fn configuration_errors_abort_loading() {
        let mut options = options();
        options.procedures = tree("broken:\n  operations:\n    x: { type: nope }\n");
        let error = create_application(options).err().expect("broken procedure");
        assert_eq!(error.code, "TEMPLATE_UNKNOWN_OPERATION");
    }
}
