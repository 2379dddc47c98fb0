use anyhow::{Result, anyhow, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::prompt::PromptProfile;
use crate::server::relay::ResponseMode;
use crate::session::map::DEFAULT_TILE_URL;

pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_DATASET_PATH: &str = "data/neighborhoods.json";
pub const DEFAULT_LOG_LEVEL: &str = "info";

const CONFIG_DIR_NAME: &str = "climate-chat";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub groq_base_url: String,
    pub bind_addr: String,
    pub dataset_path: PathBuf,
    pub response_mode: ResponseMode,
    pub prompt_profile: PromptProfile,
    pub server_url: String,
    pub map_tile_url: String,
    pub log_level: String,
    pub http_debug: bool,
    pub theme: ThemeConfig,
    pub config_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeConfig {
    pub preset: ThemePreset,
    pub styles: HashMap<ThemeToken, StyleOverride>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            preset: ThemePreset::Default,
            styles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemePreset {
    Default,
    Light,
    HighContrast,
}

impl FromStr for ThemePreset {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "default" => Ok(Self::Default),
            "light" => Ok(Self::Light),
            "high-contrast" => Ok(Self::HighContrast),
            _ => Err(format!("unknown preset '{value}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeToken {
    UserLabel,
    UserText,
    AssistantLabel,
    AssistantText,
    AssistantWaiting,
    Heading,
    Code,
    Link,
    Quote,
    MapMarker,
    SystemInfo,
    SystemError,
    Status,
    InputBlock,
}

impl ThemeToken {
    pub fn all() -> &'static [ThemeToken] {
        &[
            Self::UserLabel,
            Self::UserText,
            Self::AssistantLabel,
            Self::AssistantText,
            Self::AssistantWaiting,
            Self::Heading,
            Self::Code,
            Self::Link,
            Self::Quote,
            Self::MapMarker,
            Self::SystemInfo,
            Self::SystemError,
            Self::Status,
            Self::InputBlock,
        ]
    }
}

impl FromStr for ThemeToken {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "user_label" => Ok(Self::UserLabel),
            "user_text" => Ok(Self::UserText),
            "assistant_label" => Ok(Self::AssistantLabel),
            "assistant_text" => Ok(Self::AssistantText),
            "assistant_waiting" => Ok(Self::AssistantWaiting),
            "heading" => Ok(Self::Heading),
            "code" => Ok(Self::Code),
            "link" => Ok(Self::Link),
            "quote" => Ok(Self::Quote),
            "map_marker" => Ok(Self::MapMarker),
            "system_info" => Ok(Self::SystemInfo),
            "system_error" => Ok(Self::SystemError),
            "status" => Ok(Self::Status),
            "input_block" => Ok(Self::InputBlock),
            _ => Err(format!("unknown token '{value}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOverride {
    pub fg: Option<HexColor>,
    pub bg: Option<HexColor>,
    pub modifiers: Option<Vec<ThemeModifier>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl FromStr for HexColor {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        const EXPECTED: &str = "invalid hex color, expected #RRGGBB";
        let hex = value
            .strip_prefix('#')
            .filter(|hex| hex.len() == 6 && hex.is_ascii())
            .ok_or_else(|| EXPECTED.to_string())?;

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| EXPECTED.to_string())
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeModifier {
    Bold,
    Dim,
    Italic,
    Underlined,
    Reversed,
    CrossedOut,
}

impl FromStr for ThemeModifier {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "bold" => Ok(Self::Bold),
            "dim" => Ok(Self::Dim),
            "italic" => Ok(Self::Italic),
            "underlined" => Ok(Self::Underlined),
            "reversed" => Ok(Self::Reversed),
            "crossed_out" => Ok(Self::CrossedOut),
            _ => Err(format!("unknown modifier '{value}'")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFileConfig {
    groq_api_key: Option<String>,
    groq_model: Option<String>,
    groq_base_url: Option<String>,
    bind_addr: Option<String>,
    dataset_path: Option<PathBuf>,
    response_mode: Option<String>,
    prompt_profile: Option<String>,
    server_url: Option<String>,
    map_tile_url: Option<String>,
    log_level: Option<String>,
    http_debug: Option<bool>,
    theme: Option<RawThemeConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThemeConfig {
    name: Option<String>,
    styles: Option<HashMap<String, RawStyleOverride>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStyleOverride {
    fg: Option<String>,
    bg: Option<String>,
    modifiers: Option<Vec<String>>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_with_path(None)
    }

    /// Defaults, then the TOML file, then `.env` and the process environment.
    /// An explicit path must exist; the discovered one is optional.
    pub fn load_with_path(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    bail!("Failed to load config {}: file not found", path.display());
                }
                path.to_path_buf()
            }
            None => discover_config_path()?,
        };
        let file = load_file_config(&config_path)?.unwrap_or_default();

        dotenvy::dotenv().ok();

        let theme = validate_theme(file.theme.as_ref(), &config_path)?;
        let response_mode = parse_setting(
            env_non_empty("CLIMATE_CHAT_MODE"),
            file.response_mode.as_deref(),
            &config_path,
            "response_mode",
        )?;
        let prompt_profile = parse_setting(
            None,
            file.prompt_profile.as_deref(),
            &config_path,
            "prompt_profile",
        )?;

        Ok(Self {
            groq_api_key: env_non_empty("GROQ_API_KEY").or(file_value(file.groq_api_key)),
            groq_model: env_non_empty("GROQ_MODEL")
                .or(file_value(file.groq_model))
                .unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            groq_base_url: env_non_empty("GROQ_BASE_URL")
                .or(file_value(file.groq_base_url))
                .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string()),
            bind_addr: env_non_empty("CLIMATE_CHAT_BIND")
                .or(file_value(file.bind_addr))
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            dataset_path: env_non_empty("CLIMATE_CHAT_DATASET")
                .map(PathBuf::from)
                .or(file.dataset_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_PATH)),
            response_mode,
            prompt_profile,
            server_url: env_non_empty("CLIMATE_CHAT_SERVER")
                .or(file_value(file.server_url))
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            map_tile_url: file_value(file.map_tile_url)
                .unwrap_or_else(|| DEFAULT_TILE_URL.to_string()),
            log_level: file_value(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            http_debug: file.http_debug.unwrap_or(false),
            theme,
            config_path,
        })
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        let trimmed = xdg.trim();
        if trimmed.is_empty() {
            bail!("Failed to resolve config path: XDG_CONFIG_HOME is set but empty");
        }

        return Ok(PathBuf::from(trimmed)
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME));
    }

    let home = dirs::home_dir()
        .ok_or_else(|| anyhow!("Failed to resolve config path: HOME directory is unavailable"))?;

    Ok(home
        .join(".config")
        .join(CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME))
}

fn load_file_config(config_path: &Path) -> Result<Option<RawFileConfig>> {
    if !config_path.is_file() {
        return Ok(None);
    }

    let config_text = fs::read_to_string(config_path).map_err(|err| {
        anyhow!(
            "Failed to load config {}: unable to read file: {err}",
            config_path.display()
        )
    })?;

    toml::from_str(&config_text)
        .map(Some)
        .map_err(|err| anyhow!("Failed to load config {}: {err}", config_path.display()))
}

/// Environment wins over the file; a bad value names where it came from.
fn parse_setting<T>(
    env_value: Option<String>,
    file_value: Option<&str>,
    config_path: &Path,
    key: &str,
) -> Result<T>
where
    T: FromStr<Err = String> + Default,
{
    if let Some(value) = env_value {
        return T::from_str(&value).map_err(|reason| anyhow!("Failed to load config: {reason}"));
    }

    match file_value.and_then(non_empty) {
        Some(value) => T::from_str(value).map_err(|reason| config_error(config_path, key, &reason)),
        None => Ok(T::default()),
    }
}

fn validate_theme(raw_theme: Option<&RawThemeConfig>, config_path: &Path) -> Result<ThemeConfig> {
    let Some(theme) = raw_theme else {
        return Ok(ThemeConfig::default());
    };

    let mut config = ThemeConfig::default();

    if let Some(name) = &theme.name {
        config.preset = ThemePreset::from_str(name)
            .map_err(|reason| config_error(config_path, "theme.name", &reason))?;
    }

    if let Some(styles) = &theme.styles {
        for (token_name, raw_style) in styles {
            let token = ThemeToken::from_str(token_name).map_err(|reason| {
                config_error(config_path, &format!("theme.styles.{token_name}"), &reason)
            })?;

            let fg = parse_color(raw_style.fg.as_deref(), config_path, token_name, "fg")?;
            let bg = parse_color(raw_style.bg.as_deref(), config_path, token_name, "bg")?;
            let modifiers =
                parse_modifiers(raw_style.modifiers.as_deref(), config_path, token_name)?;

            config
                .styles
                .insert(token, StyleOverride { fg, bg, modifiers });
        }
    }

    Ok(config)
}

fn parse_color(
    value: Option<&str>,
    config_path: &Path,
    token_name: &str,
    field_name: &str,
) -> Result<Option<HexColor>> {
    let Some(value) = value else {
        return Ok(None);
    };

    HexColor::from_str(value).map(Some).map_err(|reason| {
        config_error(
            config_path,
            &format!("theme.styles.{token_name}.{field_name}"),
            &reason,
        )
    })
}

fn parse_modifiers(
    values: Option<&[String]>,
    config_path: &Path,
    token_name: &str,
) -> Result<Option<Vec<ThemeModifier>>> {
    let Some(values) = values else {
        return Ok(None);
    };

    values
        .iter()
        .map(|value| {
            ThemeModifier::from_str(value).map_err(|reason| {
                config_error(
                    config_path,
                    &format!("theme.styles.{token_name}.modifiers"),
                    &reason,
                )
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|value| non_empty(&value).map(ToOwned::to_owned))
}

fn file_value(value: Option<String>) -> Option<String> {
    value.and_then(|value| non_empty(&value).map(ToOwned::to_owned))
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn config_error(config_path: &Path, key_path: &str, reason: &str) -> anyhow::Error {
    anyhow!(
        "Failed to load config {}: {key_path}: {reason}",
        config_path.display()
    )
}
