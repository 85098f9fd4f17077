use anyhow::{Context, Result, anyhow};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::downloader::DEFAULT_OUTPUT_DIR;
use crate::extractor::DEFAULT_PROGRAM;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/download-channel-env";
pub const CONFIG_ENV_VAR: &str = "DOWNLOAD_CHANNEL_CONFIG";
pub const DEFAULT_MAX_DISPLAY: usize = 20;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub output_dir: Option<PathBuf>,
    pub cookie_file: Option<PathBuf>,
    pub ytdlp_path: Option<PathBuf>,
    pub max_display: Option<usize>,
}

impl EnvConfig {
    pub fn output_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn cookie_file(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.cookie_file.clone())
    }

    pub fn max_display(&self, flag: Option<usize>) -> usize {
        flag.or(self.max_display).unwrap_or(DEFAULT_MAX_DISPLAY)
    }

    pub fn ytdlp_program(&self) -> PathBuf {
        self.ytdlp_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM))
    }
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "OUTPUT_DIR" => cfg.output_dir = Some(PathBuf::from(value)),
                "COOKIE_FILE" => cfg.cookie_file = Some(PathBuf::from(value)),
                "YTDLP_PATH" => cfg.ytdlp_path = Some(PathBuf::from(value)),
                "MAX_DISPLAY" => {
                    let max: usize = value
                        .parse()
                        .with_context(|| format!("Parsing MAX_DISPLAY from {}", path.display()))?;
                    cfg.max_display = Some(max);
                }
                other => log::debug!("ignoring unknown key {other} in {}", path.display()),
            }
        }
    }
    Ok(Some(cfg))
}

/// Loads configuration from `--config`, then `$DOWNLOAD_CHANNEL_CONFIG`, then
/// the system default. Only the system default may be absent.
pub fn load_config(explicit: Option<&Path>) -> Result<EnvConfig> {
    let from_env = env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    load_config_from(explicit, from_env.as_deref(), Path::new(DEFAULT_CONFIG_PATH))
}

pub fn load_config_from(
    explicit: Option<&Path>,
    from_env: Option<&Path>,
    fallback: &Path,
) -> Result<EnvConfig> {
    if let Some(path) = explicit.or(from_env) {
        return read_env_config(path)?
            .ok_or_else(|| anyhow!("Missing config file at {}", path.display()));
    }
    Ok(read_env_config(fallback)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn read_env_config_extracts_values() {
        let cfg = make_config(
            concat!(
                "# comment\n",
                "OUTPUT_DIR=\"/media/yt\"\n",
                "COOKIE_FILE=/home/u/cookies.txt\n",
                "MAX_DISPLAY=\"50\"\n",
            ),
        );
        let parsed = read_env_config(cfg.path()).unwrap().unwrap();
        assert_eq!(parsed.output_dir, Some(PathBuf::from("/media/yt")));
        assert_eq!(parsed.cookie_file, Some(PathBuf::from("/home/u/cookies.txt")));
        assert_eq!(parsed.max_display, Some(50));
        assert_eq!(parsed.ytdlp_path, None);
    }

    #[test]
    fn bad_max_display_is_an_error() {
        let cfg = make_config("MAX_DISPLAY=lots\n");
        assert!(read_env_config(cfg.path()).is_err());
    }

    #[test]
    fn flags_override_file_which_overrides_defaults() {
        let cfg = EnvConfig {
            output_dir: Some(PathBuf::from("/from/file")),
            max_display: Some(5),
            ..Default::default()
        };
        assert_eq!(cfg.output_dir(None), PathBuf::from("/from/file"));
        assert_eq!(
            cfg.output_dir(Some(PathBuf::from("/from/flag"))),
            PathBuf::from("/from/flag")
        );
        assert_eq!(cfg.max_display(None), 5);
        assert_eq!(cfg.max_display(Some(0)), 0);

        let empty = EnvConfig::default();
        assert_eq!(empty.output_dir(None), PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(empty.max_display(None), DEFAULT_MAX_DISPLAY);
        assert_eq!(empty.ytdlp_program(), PathBuf::from("yt-dlp"));
        assert_eq!(empty.cookie_file(None), None);
    }

    #[test]
    fn explicit_config_must_exist_but_fallback_may_not() {
        let missing = Path::new("/definitely/not/here.env");
        assert!(load_config_from(Some(missing), None, missing).is_err());
        assert!(load_config_from(None, Some(missing), missing).is_err());
        assert_eq!(
            load_config_from(None, None, missing).unwrap(),
            EnvConfig::default()
        );

        let cfg = make_config("YTDLP_PATH=/opt/yt-dlp\n");
        let loaded = load_config_from(None, Some(cfg.path()), missing).unwrap();
        assert_eq!(loaded.ytdlp_program(), PathBuf::from("/opt/yt-dlp"));
    }
}
