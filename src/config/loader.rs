//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check and read
//! 2. Environment variable expansion (pre-parse, on raw text)
//! 3. YAML parsing
//! 4. Deserialization to typed config
//! 5. Validation
//! 6. Freeze with `Arc`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::schema::ScenarioConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Limits for configuration input.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("CROWDSAFE_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<ScenarioConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    limits: ConfigLimits,
}

impl ConfigLoader {
    /// Creates a loader with the given limits.
    #[must_use]
    pub const fn new(limits: ConfigLimits) -> Self {
        Self { limits }
    }

    /// Creates a loader with default limits.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Loads a configuration file and returns the frozen configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read or exceeds the size limit
    /// - A required environment variable is missing
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.limits.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {} bytes", self.limits.max_config_size),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        self.load_str(&raw, path)
    }

    /// Loads configuration from already-read text. `path` is used only for
    /// error reporting.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the file access errors.
    pub fn load_str(&self, raw: &str, path: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();

        // Handle UTF-8 BOM
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        // Stage 1: Environment variable substitution (before YAML parsing)
        let mut env_sub = EnvSubstitution::new();
        let substituted = env_sub.substitute(raw, path)?;
        warnings.extend(env_sub.warnings);

        // Stage 2: YAML parsing
        let root: serde_yaml::Value =
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        // An empty document means "all defaults"
        let root = if root.is_null() {
            serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
        } else {
            root
        };

        // Stage 3: Deserialization
        let config: ScenarioConfig =
            serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        // Stage 4: Validation
        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }
        warnings.extend(result.warnings.into_iter().map(|w| LoadWarning {
            message: w.message,
            location: Some(w.path),
        }));

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Expands `${VAR}` references in raw YAML text.
struct EnvSubstitution {
    warnings: Vec<LoadWarning>,
}

impl EnvSubstitution {
    const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Substitutes environment variables in raw YAML text.
    ///
    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `${VAR:?message}` - fail if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw_yaml: &str, source_path: &Path) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw_yaml.len());
        let mut chars = raw_yaml.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let spec = Self::parse_var_spec(&mut chars, source_path)?;
                    match (std::env::var(&spec.name), spec.fallback) {
                        (Ok(value), _) => result.push_str(&value),
                        (Err(_), Some(Fallback::Default(default))) => result.push_str(&default),
                        (Err(_), Some(Fallback::Required(message))) => {
                            return Err(ConfigError::EnvVarNotSet {
                                var: spec.name,
                                location: message,
                            });
                        }
                        (Err(_), None) => self.warnings.push(LoadWarning {
                            message: format!(
                                "Environment variable '{}' is not set, using empty string",
                                spec.name
                            ),
                            location: Some(source_path.display().to_string()),
                        }),
                    }
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }

    /// Parses a variable specification from `${...}`.
    fn parse_var_spec(
        chars: &mut std::iter::Peekable<std::str::Chars>,
        source_path: &Path,
    ) -> Result<VarSpec, ConfigError> {
        let mut name = String::new();

        while let Some(c) = chars.next() {
            match c {
                '}' => return Ok(VarSpec { name, fallback: None }),
                ':' => match chars.peek() {
                    Some('-') => {
                        chars.next();
                        let default = Self::read_until_close(chars, &name, source_path)?;
                        return Ok(VarSpec {
                            name,
                            fallback: Some(Fallback::Default(default)),
                        });
                    }
                    Some('?') => {
                        chars.next();
                        let message = Self::read_until_close(chars, &name, source_path)?;
                        return Ok(VarSpec {
                            name,
                            fallback: Some(Fallback::Required(message)),
                        });
                    }
                    _ => name.push(':'),
                },
                _ => name.push(c),
            }
        }

        Err(unclosed(&name, source_path))
    }

    /// Reads content until the closing `}`, allowing nested braces.
    fn read_until_close(
        chars: &mut std::iter::Peekable<std::str::Chars>,
        name: &str,
        source_path: &Path,
    ) -> Result<String, ConfigError> {
        let mut value = String::new();
        let mut depth = 1;

        for c in chars.by_ref() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(value);
                    }
                }
                _ => {}
            }
            value.push(c);
        }

        Err(unclosed(name, source_path))
    }
}

struct VarSpec {
    name: String,
    fallback: Option<Fallback>,
}

enum Fallback {
    Default(String),
    Required(String),
}

fn unclosed(name: &str, source_path: &Path) -> ConfigError {
    ConfigError::ParseError {
        path: PathBuf::from(source_path),
        line: None,
        message: format!("Unclosed environment variable reference: ${{{name}"),
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
