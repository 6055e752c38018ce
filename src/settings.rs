use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::gateways::LanguagePair;
use crate::script::ScriptDetector;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub languages: LanguagePair,
    pub script: ScriptDetector,
    pub vision_endpoint: String,
    pub translate_endpoint: String,
    pub credentials_path: Option<String>,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:5000".to_string(),
            languages: LanguagePair::default(),
            script: ScriptDetector::sinhala(),
            vision_endpoint: crate::gateways::vision::DEFAULT_ENDPOINT.to_string(),
            translate_endpoint: crate::gateways::translate::DEFAULT_ENDPOINT.to_string(),
            credentials_path: None,
            timeout_secs: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    translation: Option<TranslationSettings>,
    script: Option<ScriptSettings>,
    google: Option<GoogleSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslationSettings {
    source_lang: Option<String>,
    target_lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ScriptSettings {
    start: Option<String>,
    end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GoogleSettings {
    vision_endpoint: Option<String>,
    translate_endpoint: Option<String>,
    credentials_path: Option<String>,
    timeout_secs: Option<u64>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings
                .merge(parsed)
                .with_context(|| format!("invalid settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(server) = incoming.server
            && let Some(addr) = non_empty(server.addr)
        {
            self.server_addr = addr;
        }
        if let Some(translation) = incoming.translation {
            if let Some(source) = non_empty(translation.source_lang) {
                self.languages.source = source;
            }
            if let Some(target) = non_empty(translation.target_lang) {
                self.languages.target = target;
            }
        }
        if let Some(script) = incoming.script {
            let start = non_empty(script.start)
                .unwrap_or_else(|| format!("{:04X}", self.script.start() as u32));
            let end = non_empty(script.end)
                .unwrap_or_else(|| format!("{:04X}", self.script.end() as u32));
            self.script = ScriptDetector::from_hex(&start, &end)?;
        }
        if let Some(google) = incoming.google {
            if let Some(endpoint) = non_empty(google.vision_endpoint) {
                self.vision_endpoint = endpoint;
            }
            if let Some(endpoint) = non_empty(google.translate_endpoint) {
                self.translate_endpoint = endpoint;
            }
            if let Some(path) = non_empty(google.credentials_path) {
                self.credentials_path = Some(path);
            }
            if let Some(timeout) = google.timeout_secs {
                self.timeout_secs = timeout;
            }
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".ocr-translator-rust"))
        }
    })
}
