//! File configuration supplying defaults for the `collect` subcommand.
//!
//! The file is a flat list of `key = value` lines; strings are double-quoted,
//! numbers are bare, `#` starts a comment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Defaults read from `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Root holding `raw/pdfs` and `processed`.
    pub data_dir: Option<PathBuf>,
    pub target: Option<usize>,
    pub query: Option<String>,
    pub output_prefix: Option<String>,
    pub pdf_timeout_secs: Option<u64>,
    pub pdf_retries: Option<u32>,
    pub pdf_retry_delay_secs: Option<u64>,
    pub api_delay_secs: Option<u64>,
    pub backoff_delay_secs: Option<u64>,
    pub max_empty_pages: Option<u32>,
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against the same ranges the CLI accepts.
    pub fn validate(&self) -> Result<()> {
        if let Some(target) = self.target
            && !(1..=1_000_000).contains(&target)
        {
            bail!("Invalid config value for `target`: {target}. Expected range: 1..=1000000");
        }
        if let Some(retries) = self.pdf_retries
            && !(1..=10).contains(&retries)
        {
            bail!("Invalid config value for `pdf_retries`: {retries}. Expected range: 1..=10");
        }
        if let Some(pages) = self.max_empty_pages
            && pages == 0
        {
            bail!("Invalid config value for `max_empty_pages`: 0. Expected at least 1");
        }
        validate_non_empty("query", self.query.as_deref())?;
        validate_non_empty("output_prefix", self.output_prefix.as_deref())?;
        validate_secs("pdf_timeout_secs", self.pdf_timeout_secs, 1)?;
        validate_secs("pdf_retry_delay_secs", self.pdf_retry_delay_secs, 0)?;
        validate_secs("api_delay_secs", self.api_delay_secs, 0)?;
        validate_secs("backoff_delay_secs", self.backoff_delay_secs, 0)?;
        Ok(())
    }
}

fn validate_non_empty(field: &str, value: Option<&str>) -> Result<()> {
    if let Some(value) = value
        && value.trim().is_empty()
    {
        bail!("Invalid config value for `{field}`: must not be empty");
    }
    Ok(())
}

fn validate_secs(field: &str, value: Option<u64>, min: u64) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(min..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..=3600");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log filter directive used when neither `RUST_LOG` nor a CLI flag is set.
    #[must_use]
    pub fn default_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/paper-harvester/config.toml`
/// 2. `$HOME/.config/paper-harvester/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("paper-harvester")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("paper-harvester")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config at `path`, or the default location when `None`.
///
/// A missing file at the default location yields `Ok(None)`; an explicitly
/// named file must exist.
pub fn load_file_config(path: Option<&Path>) -> Result<Option<FileConfig>> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => match resolve_default_config_path() {
            Some(path) => (path, false),
            None => return Ok(None),
        },
    };

    if !explicit && !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config = parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
    Ok(Some(config))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {}", line_index + 1);

        match key {
            "data_dir" => {
                cfg.data_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "query" => cfg.query = Some(parse_string_literal(value).with_context(context)?),
            "output_prefix" => {
                cfg.output_prefix = Some(parse_string_literal(value).with_context(context)?);
            }
            "target" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                cfg.target = Some(usize::try_from(parsed).with_context(context)?);
            }
            "pdf_timeout_secs" => {
                cfg.pdf_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "pdf_retries" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                cfg.pdf_retries = Some(u32::try_from(parsed).with_context(context)?);
            }
            "pdf_retry_delay_secs" => {
                cfg.pdf_retry_delay_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "api_delay_secs" => {
                cfg.api_delay_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "backoff_delay_secs" => {
                cfg.backoff_delay_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "max_empty_pages" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                cfg.max_empty_pages = Some(u32::try_from(parsed).with_context(context)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!(
                        "Invalid `verbosity` value '{}' on line {}",
                        parsed,
                        line_index + 1
                    )
                })?);
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
target = 200
verbosity = "verbose"
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.target, Some(200));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
        assert!(cfg.data_dir.is_none());
    }

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
data_dir = "/srv/harvest"
target = 50
query = "cat:cs.CL"
output_prefix = "cl_intros"
pdf_timeout_secs = 30
pdf_retries = 5
pdf_retry_delay_secs = 2
api_delay_secs = 3
backoff_delay_secs = 10
max_empty_pages = 40
verbosity = "quiet"
"#,
        )
        .expect("full config should parse");
        assert_eq!(cfg.data_dir, Some(PathBuf::from("/srv/harvest")));
        assert_eq!(cfg.query.as_deref(), Some("cat:cs.CL"));
        assert_eq!(cfg.output_prefix.as_deref(), Some("cl_intros"));
        assert_eq!(cfg.pdf_timeout_secs, Some(30));
        assert_eq!(cfg.pdf_retries, Some(5));
        assert_eq!(cfg.pdf_retry_delay_secs, Some(2));
        assert_eq!(cfg.api_delay_secs, Some(3));
        assert_eq!(cfg.backoff_delay_secs, Some(10));
        assert_eq!(cfg.max_empty_pages, Some(40));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Quiet));
    }

    #[test]
    fn test_parse_config_rejects_zero_target() {
        let err = parse_config_str("target = 0").expect_err("invalid target expected");
        assert!(err.to_string().contains("target"));
    }

    #[test]
    fn test_parse_config_rejects_retries_out_of_range() {
        let err = parse_config_str("pdf_retries = 11").expect_err("invalid retries expected");
        assert!(err.to_string().contains("pdf_retries"));
    }

    #[test]
    fn test_parse_config_rejects_zero_timeout() {
        let err = parse_config_str("pdf_timeout_secs = 0").expect_err("invalid timeout expected");
        assert!(err.to_string().contains("pdf_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_empty_query() {
        let err = parse_config_str(r#"query = "  ""#).expect_err("empty query expected");
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err = parse_config_str("target = 4 trailing").expect_err("expected trailing token error");
        assert!(err.to_string().contains("target"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_string() {
        let err = parse_config_str("query = cat:cs.AI").expect_err("expected quoting error");
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
query = "cat:cs.AI # not a comment" # trailing comment
max_empty_pages = 12 # stop eventually
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.query.as_deref(), Some("cat:cs.AI # not a comment"));
        assert_eq!(cfg.max_empty_pages, Some(12));
    }

    #[test]
    fn test_parse_config_rejects_unknown_key() {
        let err = parse_config_str("concurrency = 4").expect_err("unknown key expected");
        assert!(err.to_string().contains("Unknown configuration key"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("target 4").expect_err("syntax error expected");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_verbosity_default_levels() {
        assert_eq!(VerbositySetting::Default.default_level(), "info");
        assert_eq!(VerbositySetting::Verbose.default_level(), "debug");
        assert_eq!(VerbositySetting::Quiet.default_level(), "error");
        assert_eq!(VerbositySetting::Debug.default_level(), "trace");
    }

    #[test]
    fn test_load_file_config_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "target = 7\n").unwrap();

        let cfg = load_file_config(Some(&path)).unwrap().unwrap();
        assert_eq!(cfg.target, Some(7));
    }

    #[test]
    fn test_load_file_config_explicit_missing_path_is_error() {
        let temp = TempDir::new().unwrap();
        let err = load_file_config(Some(&temp.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
