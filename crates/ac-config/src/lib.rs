//! Configuration trees for the admin runtime: YAML and JSON documents read
//! into untyped `DataValue` trees, configuration directories and
//! application settings.

pub mod settings;
pub mod source;
pub mod tree;

pub use settings::{ApplicationSettings, UserSettings};
pub use source::{load_config_dir, resolve_config_dir, ConfigDirectory};
pub use tree::{json_to_value, overlay, parse_tree, yaml_to_value, ConfigFormat};
