use crate::schema::EngineConfig;
use anyhow::{anyhow, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Jsonc,
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;

        match ext {
            "jsonc" => Some(Self::Jsonc),
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: EngineConfig,
    pub path: PathBuf,
    pub format: ConfigFormat,
}

pub fn load_config(config_path: Option<&Path>) -> Result<EngineConfig> {
    resolve_config(config_path).map(|r| r.config)
}

/// Like [`load_config`], but falls back to defaults when no file is given
/// and none is found. An explicit path that fails to load is still an error.
pub fn load_config_or_default(config_path: Option<&Path>) -> Result<EngineConfig> {
    match config_path {
        Some(path) => load_config_from_file(path).map(|r| r.config),
        None => match find_config_file() {
            Some(path) => load_config_from_file(&path).map(|r| r.config),
            None => {
                tracing::debug!("No configuration file found, using defaults");
                Ok(EngineConfig::default())
            }
        },
    }
}

pub fn resolve_config(config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let path = config_path
        .map(|p| p.to_path_buf())
        .or_else(find_config_file)
        .ok_or_else(|| anyhow!("No configuration file found"))?;

    load_config_from_file(&path)
}

pub fn load_config_from_file(path: &Path) -> Result<ResolvedConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| anyhow!("Unknown config format for: {}", path.display()))?;

    let config = parse_config_content(&content, format)?;
    tracing::debug!("Loaded configuration from {}", path.display());

    Ok(ResolvedConfig {
        config: expand_env_vars(config),
        path: path.to_path_buf(),
        format,
    })
}

fn parse_config_content(content: &str, format: ConfigFormat) -> Result<EngineConfig> {
    match format {
        ConfigFormat::Jsonc => json5::from_str(content).context("Failed to parse JSONC"),
        ConfigFormat::Json => serde_json::from_str(content).context("Failed to parse JSON"),
        ConfigFormat::Yaml => serde_yaml_ng::from_str(content).context("Failed to parse YAML"),
    }
}

const CONFIG_CANDIDATES: &[&str] = &[
    "concord.jsonc",
    "concord.json",
    "concord.yml",
    "concord.yaml",
    ".concord.jsonc",
    ".concord.json",
    ".concord.yml",
    ".concord.yaml",
];

fn user_config_dir() -> Option<PathBuf> {
    env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config").join("concord"))
}

fn find_config_file() -> Option<PathBuf> {
    find_all_config_files().into_iter().next()
}

/// Every existing config file, working directory first
pub fn find_all_config_files() -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = CONFIG_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .filter(|path| path.exists())
        .collect();

    if let Some(dir) = user_config_dir() {
        found.extend(
            CONFIG_CANDIDATES
                .iter()
                .map(|candidate| dir.join(candidate))
                .filter(|path| path.exists()),
        );
    }

    found
}

fn expand_env_vars(mut config: EngineConfig) -> EngineConfig {
    config.edit_tool_fragment = expand_env_string(&config.edit_tool_fragment);
    config.synthesized_edit_tool_name = expand_env_string(&config.synthesized_edit_tool_name);
    config.failure_fingerprints = config
        .failure_fingerprints
        .iter()
        .map(|f| expand_env_string(f))
        .collect();
    config.telemetry.level = expand_env_string(&config.telemetry.level);
    config
}

fn expand_env_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        if chars.peek() == Some(&'{') {
            chars.next();
            let var_name: String = chars.by_ref().take_while(|&c| c != '}').collect();
            match env::var(&var_name) {
                Ok(value) => result.push_str(&value),
                Err(_) => {
                    result.push_str("${");
                    result.push_str(&var_name);
                    result.push('}');
                }
            }
            continue;
        }

        // Stop at the first non-identifier char without consuming it
        let mut var_name = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                var_name.push(c);
                chars.next();
            } else {
                break;
            }
        }

        if var_name.is_empty() {
            result.push('$');
        } else if let Ok(value) = env::var(&var_name) {
            result.push_str(&value);
        } else {
            result.push('$');
            result.push_str(&var_name);
        }
    }

    result
}
