use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::Deserialize;
use std::{fs, path::PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    /// PDF export to read entries from.
    pub input: PathBuf,
    /// Directory the photographs are written to. Created on demand.
    pub output_dir: PathBuf,
    /// Zero-based index of the first page to scan. Pages before it (cover,
    /// table of contents) are never read. Default is 2.
    pub start_page: usize,
    /// Program used to embed captions. Default is `exiftool` from `$PATH`.
    pub exiftool: String,
    /// When false, images are written and backdated but not tagged.
    pub tag_captions: bool,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    start_page: Option<usize>,
    exiftool: Option<String>,
    tag_captions: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file_config(FileConfig::default())
    }
}

impl Config {
    /// Public entrypoint: load config from disk (first XDG path, then native) and apply defaults.
    ///
    /// A missing config file is not an error; a malformed one is.
    pub fn load() -> Result<Self> {
        let file_config = Self::read_file_config()?;
        Ok(Self::from_file_config(file_config))
    }

    fn from_file_config(file_config: FileConfig) -> Self {
        Self {
            input: file_config
                .input
                .unwrap_or_else(|| PathBuf::from("input.pdf")),
            output_dir: file_config
                .output_dir
                .unwrap_or_else(|| PathBuf::from("output")),
            start_page: file_config.start_page.unwrap_or(2),
            exiftool: file_config
                .exiftool
                .unwrap_or_else(|| "exiftool".to_string()),
            tag_captions: file_config.tag_captions.unwrap_or(true),
        }
    }

    /// Candidate config files, in priority order.
    pub fn config_file_paths() -> Vec<PathBuf> {
        let mut v = Vec::new();
        if let Some(b) = BaseDirs::new() {
            let xdg = b
                .home_dir()
                .join(".config")
                .join("journalpix")
                .join("config.toml");
            v.push(xdg);
            let native = b.config_dir().join("journalpix").join("config.toml");
            if !v.contains(&native) {
                v.push(native);
            }
        }
        v
    }

    /// Read the first existing config file and parse it.
    fn read_file_config() -> Result<FileConfig> {
        for path in Self::config_file_paths() {
            if !path.exists() {
                continue;
            }
            let s =
                fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config file");
            return Self::parse_file(&s).with_context(|| format!("parsing {}", path.display()));
        }
        Ok(FileConfig::default())
    }

    /// Parse a TOML string into `FileConfig`.
    fn parse_file(s: &str) -> Result<FileConfig> {
        Ok(toml::from_str::<FileConfig>(s)?)
    }
}
