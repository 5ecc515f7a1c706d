use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::adapters::llm::{ModelConfig, DEFAULT_MODEL};
use crate::core::limiter::TruncationLimits;
use crate::core::transcript::DEFAULT_SYSTEM_PROMPT;

pub const MAX_CHOICES: usize = 10;
const CONFIG_FILE_NAMES: [&str; 2] = [".commitgpt.yml", ".commitgpt.yaml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_choices")]
    pub choices: usize,

    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,

    #[serde(default)]
    pub limits: TruncationLimits,
}

/// Values given on the command line; `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub choices: Option<usize>,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
    pub log_lines: Option<usize>,
    pub diff_lines_per_file: Option<usize>,
    pub diff_total_lines: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            choices: default_choices(),
            temperature: None,
            system_prompt: None,
            api_key: None,
            base_url: None,
            limits: TruncationLimits::default(),
        }
    }
}

impl Config {
    /// Loads the first config file found in the current directory, then the
    /// home directory. Falls back to defaults when there is none.
    pub fn load() -> Result<Self> {
        let mut candidates: Vec<PathBuf> = CONFIG_FILE_NAMES.iter().map(PathBuf::from).collect();
        if let Some(home_dir) = dirs::home_dir() {
            candidates.push(home_dir.join(CONFIG_FILE_NAMES[0]));
        }

        for path in candidates {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Config::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn merge_with_cli(&mut self, cli: CliOverrides) {
        if let Some(model) = cli.model {
            self.model = model;
        }
        if let Some(choices) = cli.choices {
            self.choices = choices;
        }
        if let Some(temperature) = cli.temperature {
            self.temperature = Some(temperature);
        }
        if let Some(prompt) = cli.system_prompt {
            self.system_prompt = Some(prompt);
        }
        if let Some(lines) = cli.log_lines {
            self.limits.log_lines = lines;
        }
        if let Some(lines) = cli.diff_lines_per_file {
            self.limits.diff_lines_per_file = lines;
        }
        if let Some(lines) = cli.diff_total_lines {
            self.limits.diff_total_lines = lines;
        }
    }

    pub fn normalize(&mut self) {
        self.choices = self.choices.clamp(1, MAX_CHOICES);
        if self.model.trim().is_empty() {
            self.model = default_model();
        }
        if let Some(temperature) = self.temperature {
            self.temperature = Some(temperature.clamp(0.0, 2.0));
        }
        self.limits.log_lines = self.limits.log_lines.max(1);
        self.limits.diff_lines_per_file = self.limits.diff_lines_per_file.max(1);
        self.limits.diff_total_lines = self.limits.diff_total_lines.max(1);
        if matches!(&self.system_prompt, Some(p) if p.trim().is_empty()) {
            self.system_prompt = None;
        }
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn model_config(&self, api_key: String) -> ModelConfig {
        ModelConfig {
            model_name: self.model.clone(),
            api_key: Some(api_key),
            base_url: self.base_url.clone(),
            temperature: self.temperature,
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_choices() -> usize {
    3
}
