use ac_core::{AdminError, AdminResult};
use ac_runtime::{Access, ApplicationUser};
use serde::{Deserialize, Serialize};

use crate::tree::ConfigFormat;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ApplicationSettings {
    pub console_name: String,
    pub log_filter: Option<String>,
    pub users: Vec<UserSettings>,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            console_name: "console".to_string(),
            log_filter: None,
            users: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserSettings {
    pub name: String,
    #[serde(default = "guest_access")]
    pub access: Access,
}

fn guest_access() -> Access {
    Access::Guest
}

impl ApplicationSettings {
    pub fn parse(text: &str, format: ConfigFormat) -> AdminResult<Self> {
        match format {
            ConfigFormat::Yaml if text.trim().is_empty() => Ok(Self::default()),
            ConfigFormat::Yaml => serde_yaml_ng::from_str(text).map_err(|error| {
                AdminError::config("CONFIG_SETTINGS_INVALID", format!("Invalid settings: {}", error))
            }),
            ConfigFormat::Json => serde_json::from_str(text).map_err(|error| {
                AdminError::config("CONFIG_SETTINGS_INVALID", format!("Invalid settings: {}", error))
            }),
        }
    }

    /// The console user, always with root access.
    pub fn console_user(&self) -> ApplicationUser {
        ApplicationUser::new(self.console_name.clone(), Access::Root)
    }

    pub fn user(&self, name: &str) -> Option<ApplicationUser> {
        self.users
            .iter()
            .find(|user| user.name.eq_ignore_ascii_case(name))
            .map(|user| ApplicationUser::new(user.name.clone(), user.access))
    }
}

#[cfg(test)]
mod settings_tests {
    use super::*;

    #[test]
    fn settings_fill_defaults() {
        let settings = ApplicationSettings::parse("log-filter: debug\n", ConfigFormat::Yaml).expect("yaml");
        assert_eq!(settings.console_name, "console");
        assert_eq!(settings.log_filter.as_deref(), Some("debug"));
        assert!(settings.users.is_empty());
        assert_eq!(ApplicationSettings::parse("", ConfigFormat::Yaml).expect("empty"), ApplicationSettings::default());
    }

    #[test]
    fn users_carry_access_levels() {
        let settings = ApplicationSettings::parse(
            r#"{"console-name": "ops", "users": [{"name": "ann", "access": "admin"}, {"name": "bo"}]}"#,
            ConfigFormat::Json,
        )
        .expect("json");
        assert_eq!(settings.console_user().name(), "ops");
        assert!(settings.console_user().has_root_access());
        let ann = settings.user("ANN").expect("ann");
        assert!(ann.has_admin_access());
        assert!(!ann.has_root_access());
        assert_eq!(settings.user("bo").expect("bo").access(), Access::Guest);
        assert!(settings.user("cy").is_none());
    }

    #[test]
    fn bad_settings_are_reported() {
        let error = ApplicationSettings::parse("users: [{ access: root }]\n", ConfigFormat::Yaml)
            .expect_err("missing name");
        assert_eq!(error.code, "CONFIG_SETTINGS_INVALID");
    }
}
