use std::fs;
use std::path::{Path, PathBuf};

use ac_core::{AdminError, AdminResult, DataValue};
use tracing::debug;
use walkdir::WalkDir;

use crate::settings::ApplicationSettings;
use crate::tree::{parse_tree, ConfigFormat};

/// Trees read from one configuration directory. Missing files stay `None`.
#[derive(Default)]
pub struct ConfigDirectory {
    pub root: PathBuf,
    pub commands: Option<DataValue>,
    pub procedures: Option<DataValue>,
    pub templates: Option<DataValue>,
    pub settings: ApplicationSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigKind {
    Commands,
    Procedures,
    Templates,
    Application,
}

impl ConfigKind {
    fn from_stem(stem: &str) -> Option<Self> {
        match stem {
            "commands" => Some(Self::Commands),
            "procedures" => Some(Self::Procedures),
            "templates" => Some(Self::Templates),
            "application" => Some(Self::Application),
            _ => None,
        }
    }
}

pub fn resolve_config_dir(config_dir: &str) -> AdminResult<PathBuf> {
    let path = PathBuf::from(config_dir);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(|error| {
                AdminError::config("CONFIG_PATH", format!("Cannot read the working directory: {}", error))
            })?
            .join(path)
    };
    if !absolute.exists() {
        return Err(AdminError::config(
            "CONFIG_DIR_NOT_FOUND",
            format!("config-dir does not exist: {}", absolute.display()),
        ));
    }
    if !absolute.is_dir() {
        return Err(AdminError::config(
            "CONFIG_DIR_NOT_DIR",
            format!("config-dir is not a directory: {}", absolute.display()),
        ));
    }
    Ok(absolute)
}

/// Reads `commands`, `procedures`, `templates` and `application` files
/// (`.yml`, `.yaml` or `.json`) directly inside `config_dir`.
pub fn load_config_dir(config_dir: &str) -> AdminResult<ConfigDirectory> {
    let root = resolve_config_dir(config_dir)?;
    let mut directory = ConfigDirectory {
        root: root.clone(),
        ..ConfigDirectory::default()
    };
    let mut seen: Vec<(ConfigKind, PathBuf)> = Vec::new();

    for entry in WalkDir::new(&root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some((kind, format)) = classify(path) else {
            debug!(path = %path.display(), "ignoring file in config dir");
            continue;
        };
        if let Some((_, previous)) = seen.iter().find(|(seen_kind, _)| *seen_kind == kind) {
            return Err(AdminError::config(
                "CONFIG_DUPLICATE_SOURCE",
                format!(
                    "Both {} and {} configure the same thing.",
                    previous.display(),
                    path.display()
                ),
            ));
        }
        seen.push((kind, path.to_path_buf()));

        let text = read_file(path)?;
        match kind {
            ConfigKind::Application => {
                directory.settings = ApplicationSettings::parse(&text, format)
                    .map_err(|error| error.with_action(format!("reading file: '{}'", path.display())))?;
            }
            _ => {
                let tree = parse_tree(&text, format)
                    .map_err(|error| error.with_action(format!("reading file: '{}'", path.display())))?;
                match kind {
                    ConfigKind::Commands => directory.commands = Some(tree),
                    ConfigKind::Procedures => directory.procedures = Some(tree),
                    _ => directory.templates = Some(tree),
                }
            }
        }
        debug!(path = %path.display(), kind = ?kind, "loaded configuration file");
    }
    Ok(directory)
}

fn classify(path: &Path) -> Option<(ConfigKind, ConfigFormat)> {
    let kind = ConfigKind::from_stem(path.file_stem()?.to_str()?)?;
    let format = ConfigFormat::from_extension(path.extension()?.to_str()?)?;
    Some((kind, format))
}

fn read_file(path: &Path) -> AdminResult<String> {
    fs::read_to_string(path).map_err(|error| {
        AdminError::config(
            "CONFIG_READ",
            format!("Cannot read {}: {}", path.display(), error),
        )
    })
}
