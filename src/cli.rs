//! CLI argument parsing for statguard

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report (default)
    Text,
    /// JSON verdict for machine parsing
    Json,
}

/// Built-in policy presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyPreset {
    Default,
    Strict,
    Permissive,
}

#[derive(Parser, Debug)]
#[command(name = "statguard")]
#[command(version)]
#[command(about = "Checks statistical test assumptions before an analysis runs", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output (to stderr)
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a dataset against a test family's assumptions
    ///
    /// Exits 0 when the analysis may proceed, 2 when it is blocked.
    Evaluate {
        /// Test family (t_test, anova, regression, ...); may also come from the input envelope
        #[arg(short = 't', long = "test", value_name = "FAMILY")]
        test: Option<String>,

        /// Input JSON file, or - for stdin
        #[arg(short = 'i', long = "input", value_name = "FILE")]
        input: Option<PathBuf>,

        /// Significance level (overrides the envelope and the policy)
        #[arg(short = 'a', long = "alpha")]
        alpha: Option<f64>,

        /// Policy TOML file
        #[arg(long = "policy", value_name = "FILE")]
        policy: Option<PathBuf>,

        /// Policy preset used when no policy file is given
        #[arg(long = "preset", value_enum, default_value = "default")]
        preset: PolicyPreset,

        /// Overall validator deadline in milliseconds
        #[arg(long = "deadline-ms", value_name = "MS")]
        deadline_ms: Option<u64>,

        /// Output format (text or json)
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the diagnostic plot payload (JSON) for a dataset
    Diagnostics {
        /// Input JSON file, or - for stdin
        #[arg(short = 'i', long = "input", value_name = "FILE")]
        input: Option<PathBuf>,

        /// Test family selecting the analysis view (differences, residuals)
        #[arg(short = 't', long = "test", value_name = "FAMILY")]
        test: Option<String>,

        /// Policy TOML file (diagnostics section)
        #[arg(long = "policy", value_name = "FILE")]
        policy: Option<PathBuf>,
    },

    /// Print the assumptions checked for each test family
    Requirements {
        /// Only this family
        #[arg(short = 't', long = "test", value_name = "FAMILY")]
        test: Option<String>,

        /// Policy TOML file (requirement overrides)
        #[arg(long = "policy", value_name = "FILE")]
        policy: Option<PathBuf>,
    },

    /// Print the effective policy as TOML with its fingerprint
    Policy {
        /// Policy TOML file
        #[arg(long = "policy", value_name = "FILE")]
        policy: Option<PathBuf>,

        /// Preset used when no policy file is given
        #[arg(long = "preset", value_enum, default_value = "default")]
        preset: PolicyPreset,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_evaluate() {
        let cli = Cli::parse_from([
            "statguard", "evaluate", "--test", "t_test", "--input", "data.json", "--alpha", "0.01",
        ]);
        match cli.command {
            Command::Evaluate {
                test,
                input,
                alpha,
                format,
                preset,
                ..
            } => {
                assert_eq!(test.as_deref(), Some("t_test"));
                assert_eq!(input, Some(PathBuf::from("data.json")));
                assert_eq!(alpha, Some(0.01));
                assert_eq!(format, OutputFormat::Text);
                assert_eq!(preset, PolicyPreset::Default);
            }
            other => panic!("Expected evaluate, got {:?}", other),
        }
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_debug_is_global() {
        let cli = Cli::parse_from(["statguard", "requirements", "--debug"]);
        assert!(cli.debug);
    }

    #[test]
    fn test_cli_format_json_and_deadline() {
        let cli = Cli::parse_from([
            "statguard",
            "evaluate",
            "--format",
            "json",
            "--deadline-ms",
            "500",
        ]);
        match cli.command {
            Command::Evaluate {
                format,
                deadline_ms,
                ..
            } => {
                assert_eq!(format, OutputFormat::Json);
                assert_eq!(deadline_ms, Some(500));
            }
            other => panic!("Expected evaluate, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_policy_preset() {
        let cli = Cli::parse_from(["statguard", "policy", "--preset", "strict"]);
        assert!(matches!(
            cli.command,
            Command::Policy {
                preset: PolicyPreset::Strict,
                policy: None
            }
        ));
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["statguard", "evaluate", "--format", "csv"]).is_err());
    }
}
