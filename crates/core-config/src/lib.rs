//! Configuration loading for `ic`.
//!
//! `ic.toml` is looked up in the working directory first, then under the
//! platform config dir (`<config_dir>/ic/ic.toml`). A missing or malformed
//! file yields defaults; unknown keys are ignored. Command line flags are
//! layered on top by the binary.
//!
//! ```toml
//! [editor]
//! eof_policy = "end"      # or "commit"
//! completion = true
//!
//! [compiler]
//! cc = "clang"
//! werror = true
//! run_mode = "library"    # memory | library | toolchain
//! options = ["-O1"]
//! temp_dir = "/tmp/ic"
//! ```

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const FILE_NAME: &str = "ic.toml";

/// What Ctrl-D does on an empty editable region.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EofSetting {
    #[default]
    End,
    Commit,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    #[serde(default)]
    pub eof_policy: EofSetting,
    #[serde(default = "EditorConfig::default_completion")]
    pub completion: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            eof_policy: EofSetting::default(),
            completion: Self::default_completion(),
        }
    }
}

impl EditorConfig {
    const fn default_completion() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    #[serde(default)]
    pub cc: Option<String>,
    #[serde(default = "CompilerConfig::default_werror")]
    pub werror: bool,
    /// Parsed by the binary so an unknown name can be reported.
    #[serde(default)]
    pub run_mode: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            cc: None,
            werror: Self::default_werror(),
            run_mode: None,
            options: Vec::new(),
            temp_dir: None,
        }
    }
}

impl CompilerConfig {
    const fn default_werror() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file text, when one was read
    pub source: Option<PathBuf>,
    pub file: ConfigFile,
}

/// Local `ic.toml`, else the platform config location.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("ic").join(FILE_NAME);
    }
    local
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config {
                raw: Some(content),
                source: Some(path),
                file,
            })
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Directory for the generated source and build artifacts.
    pub fn work_dir(&self) -> PathBuf {
        self.file
            .compiler
            .temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("ic"))
    }

    /// Configured compiler options without blank entries.
    pub fn compiler_options(&self) -> Vec<String> {
        let options = &self.file.compiler.options;
        let kept: Vec<String> = options
            .iter()
            .filter(|o| !o.trim().is_empty())
            .cloned()
            .collect();
        if kept.len() != options.len() {
            info!(
                target: "config",
                configured = options.len(),
                kept = kept.len(),
                "compiler_options_blank_dropped"
            );
        }
        kept
    }
}
