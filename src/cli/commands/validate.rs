//! `validate` command handler
//!
//! Loads each configuration file through the full loader pipeline and
//! reports what it found without running anything.

use std::path::Path;

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadWarning};
use crate::error::{ConfigError, CrowdSafeError, Severity, ValidationIssue};

/// Outcome for one file.
#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

/// Validate configuration files.
///
/// Every file is checked even after one fails; the first failure is
/// returned once all reports have been printed.
///
/// # Errors
///
/// Returns a config error for the first file that fails to load, or (with
/// `--strict`) the first file that loads with warnings.
pub fn run(args: &ValidateArgs) -> Result<(), CrowdSafeError> {
    let loader = ConfigLoader::with_defaults();
    let mut reports = Vec::with_capacity(args.files.len());
    let mut first_error = None;

    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");
        let (report, error) = check_file(&loader, path, args.strict);
        if error.is_none() {
            tracing::info!(file = %path.display(), "configuration valid");
        }
        if first_error.is_none() {
            first_error = error;
        }
        reports.push(report);
    }

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                let status = if report.valid { "ok" } else { "FAILED" };
                println!("{}: {status}", report.file);
                for line in report.errors.iter().chain(&report.warnings) {
                    println!("  {line}");
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    first_error.map_or(Ok(()), |e| Err(e.into()))
}

fn check_file(loader: &ConfigLoader, path: &Path, strict: bool) -> (FileReport, Option<ConfigError>) {
    let file = path.display().to_string();
    match loader.load(path) {
        Ok(result) => {
            let warnings: Vec<String> = result.warnings.iter().map(describe_warning).collect();
            if strict && !result.warnings.is_empty() {
                let issues = result.warnings.iter().map(warning_to_issue).collect();
                let error = ConfigError::ValidationError {
                    path: file.clone(),
                    errors: issues,
                };
                return (
                    FileReport {
                        file,
                        valid: false,
                        errors: Vec::new(),
                        warnings,
                    },
                    Some(error),
                );
            }
            (
                FileReport {
                    file,
                    valid: true,
                    errors: Vec::new(),
                    warnings,
                },
                None,
            )
        }
        Err(error) => {
            let errors = match &error {
                ConfigError::ValidationError { errors, .. } => {
                    errors.iter().map(ToString::to_string).collect()
                }
                other => vec![other.to_string()],
            };
            (
                FileReport {
                    file,
                    valid: false,
                    errors,
                    warnings: Vec::new(),
                },
                Some(error),
            )
        }
    }
}

fn describe_warning(warning: &LoadWarning) -> String {
    match &warning.location {
        Some(location) => format!("warning: {} at {location}", warning.message),
        None => format!("warning: {}", warning.message),
    }
}

fn warning_to_issue(warning: &LoadWarning) -> ValidationIssue {
    ValidationIssue {
        path: warning.location.clone().unwrap_or_default(),
        message: warning.message.clone(),
        severity: Severity::Warning,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_file_has_no_errors() {
        let file = write_config("frame_rate: 90\n");
        let (report, error) = check_file(&ConfigLoader::with_defaults(), file.path(), false);
        assert!(report.valid);
        assert!(error.is_none());
    }

    #[test]
    fn test_invalid_file_lists_issues() {
        let file = write_config("hold:\n  pose_hold: -1\n");
        let (report, error) = check_file(&ConfigLoader::with_defaults(), file.path(), false);
        assert!(!report.valid);
        assert!(!report.errors.is_empty());
        assert!(matches!(error, Some(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_strict_promotes_warnings() {
        let file = write_config("frame_rate: 20\n");
        let (report, error) = check_file(&ConfigLoader::with_defaults(), file.path(), false);
        assert!(report.valid);
        assert!(!report.warnings.is_empty());
        assert!(error.is_none());

        let (report, error) = check_file(&ConfigLoader::with_defaults(), file.path(), true);
        assert!(!report.valid);
        assert!(error.is_some());
    }

    #[test]
    fn test_missing_file_reported() {
        let (report, error) = check_file(
            &ConfigLoader::with_defaults(),
            Path::new("/nonexistent/crowdsafe.yaml"),
            false,
        );
        assert!(!report.valid);
        assert!(matches!(error, Some(ConfigError::MissingFile { .. })));
    }
}
