use std::any::Any;
use std::rc::Rc;

use ac_core::DataObject;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    Guest,
    Admin,
    Root,
}

/// Whoever issues commands. Stored in every operation scope as `executor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationUser {
    name: String,
    access: Access,
}

impl ApplicationUser {
    pub fn new(name: impl Into<String>, access: Access) -> Self {
        Self {
            name: name.into(),
            access,
        }
    }

    /// The local console operator, who always has root access.
    pub fn console() -> Self {
        Self::new("console", Access::Root)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn has_admin_access(&self) -> bool {
        self.access >= Access::Admin
    }

    pub fn has_root_access(&self) -> bool {
        self.access == Access::Root
    }
}

impl DataObject for ApplicationUser {
    fn type_name(&self) -> &str {
        "user"
    }

    fn type_description(&self) -> String {
        "User".to_string()
    }

    fn describe(&self) -> String {
        self.name.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
