use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const DEFAULT_DEST_DB: &str = "app";
pub const SQLITE_SCHEME: &str = "sqlite:";
pub const SQLITE_MEMORY_URI: &str = "sqlite::memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingConfiguration {
    pub setting: &'static str,
    pub hint: &'static str,
}

impl std::fmt::Display for MissingConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "missing {} ({})", self.setting, self.hint)
    }
}

impl std::error::Error for MissingConfiguration {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigInput {
    pub source: Option<PathBuf>,
    pub dest_uri: Option<String>,
    pub dest_db: Option<String>,
    pub service_account: Option<PathBuf>,
    pub google_application_credentials: Option<PathBuf>,
    pub home_dir: Option<PathBuf>,
    pub cwd: PathBuf,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationTarget {
    SqliteFile(PathBuf),
    SqliteMemory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    pub source_path: PathBuf,
    pub destination: DestinationTarget,
    pub database: String,
    pub service_account: Option<PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,

    #[serde(default)]
    pub client_email: Option<String>,
}

pub fn resolve_config(input: &ConfigInput) -> Result<MigrationConfig> {
    let dest_uri = non_empty(input.dest_uri.as_deref()).ok_or(MissingConfiguration {
        setting: "destination URI",
        hint: "set TWIN_MIGRATE_DEST_URI or pass --dest-uri",
    })?;
    let source = input
        .source
        .as_deref()
        .filter(|path| !path.as_os_str().is_empty())
        .ok_or(MissingConfiguration {
            setting: "source export",
            hint: "set TWIN_MIGRATE_SOURCE or pass --source",
        })?;

    if !input.cwd.is_absolute() {
        bail!("cwd must be absolute: {}", input.cwd.display());
    }
    let cwd = normalize_lexical(&input.cwd);
    let home_dir = input.home_dir.as_deref().map(normalize_lexical);

    let destination = parse_destination_uri(dest_uri, home_dir.as_deref(), &cwd)?;
    let source_path = resolve_user_path(source, home_dir.as_deref(), &cwd)?;
    let service_account = input
        .service_account
        .as_deref()
        .or(input.google_application_credentials.as_deref())
        .filter(|path| !path.as_os_str().is_empty())
        .map(|path| resolve_user_path(path, home_dir.as_deref(), &cwd))
        .transpose()?;

    Ok(MigrationConfig {
        source_path,
        destination,
        database: non_empty(input.dest_db.as_deref())
            .unwrap_or(DEFAULT_DEST_DB)
            .to_string(),
        service_account,
        dry_run: input.dry_run,
    })
}

pub fn parse_destination_uri(
    uri: &str,
    home_dir: Option<&Path>,
    cwd: &Path,
) -> Result<DestinationTarget> {
    let uri = uri.trim();
    if uri == SQLITE_MEMORY_URI {
        return Ok(DestinationTarget::SqliteMemory);
    }

    let raw_path = if let Some(rest) = uri.strip_prefix(SQLITE_SCHEME) {
        rest.strip_prefix("//").unwrap_or(rest)
    } else if let Some((scheme, _)) = uri.split_once("://") {
        bail!("unsupported destination scheme `{scheme}`; expected a sqlite URI or file path");
    } else {
        uri
    };
    if raw_path.is_empty() {
        bail!("destination URI has no database path: {uri}");
    }

    Ok(DestinationTarget::SqliteFile(resolve_user_path(
        Path::new(raw_path),
        home_dir,
        cwd,
    )?))
}

pub fn load_service_account(path: &Path) -> Result<ServiceAccount> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read service account: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid service account json: {}", path.display()))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn resolve_user_path(path: &Path, home_dir: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: Option<&Path>) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let Some(home_dir) = home_dir else {
                bail!("HOME is not set; cannot expand {}", path.display());
            };
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }

    normalized
}
