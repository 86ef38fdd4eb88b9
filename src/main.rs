use anyhow::{Context, Result};
use clap::Parser;
use statguard::cli::{Cli, Command, OutputFormat, PolicyPreset};
use statguard::dataset::Dataset;
use statguard::diagnostics::diagnostics_from_json;
use statguard::family::TestFamily;
use statguard::guardian::{Guardian, GuardianOptions};
use statguard::policy::GuardianPolicy;
use statguard::request::EvaluationRequest;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit code when the analysis is blocked by a critical violation
const EXIT_BLOCKED: i32 = 2;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_policy(path: Option<&Path>, preset: PolicyPreset) -> Result<GuardianPolicy> {
    match path {
        Some(p) => GuardianPolicy::from_file(p),
        None => Ok(match preset {
            PolicyPreset::Default => GuardianPolicy::default(),
            PolicyPreset::Strict => GuardianPolicy::strict(),
            PolicyPreset::Permissive => GuardianPolicy::permissive(),
        }),
    }
}

fn parse_family(name: &str) -> Result<TestFamily> {
    name.parse::<TestFamily>()
        .with_context(|| format!("Valid families: {}", family_names()))
}

fn family_names() -> String {
    TestFamily::ALL
        .iter()
        .map(TestFamily::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[allow(clippy::too_many_arguments)]
fn evaluate(
    test: Option<String>,
    input: Option<PathBuf>,
    alpha: Option<f64>,
    policy: Option<PathBuf>,
    preset: PolicyPreset,
    deadline_ms: Option<u64>,
    format: OutputFormat,
) -> Result<i32> {
    let policy = load_policy(policy.as_deref(), preset)?;
    let request = EvaluationRequest::read(input.as_deref())?;

    let family_name = test
        .or(request.test)
        .context("No test family given (use --test or a \"test\" field in the input)")?;
    let family = parse_family(&family_name)?;
    let alpha = alpha
        .or(request.alpha)
        .unwrap_or(policy.significance_level);
    let dataset = Dataset::from_json(&request.data).context("Invalid dataset")?;

    let mut guardian = Guardian::from_policy(policy)?;
    if let Some(ms) = deadline_ms {
        guardian = guardian.with_options(GuardianOptions::with_deadline(Duration::from_millis(ms)));
    }
    let verdict = guardian.evaluate(family, dataset, alpha)?;

    match format {
        OutputFormat::Text => print!("{}", verdict.to_report_string()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&verdict)?),
    }

    Ok(if verdict.can_proceed { 0 } else { EXIT_BLOCKED })
}

fn diagnostics(input: Option<PathBuf>, test: Option<String>, policy: Option<PathBuf>) -> Result<()> {
    let policy = load_policy(policy.as_deref(), PolicyPreset::Default)?;
    let request = EvaluationRequest::read(input.as_deref())?;
    let family = test
        .or(request.test)
        .map(|name| parse_family(&name))
        .transpose()?;
    let payload = diagnostics_from_json(&request.data, family, &policy.diagnostics);
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn requirements(test: Option<String>, policy: Option<PathBuf>) -> Result<()> {
    let policy = load_policy(policy.as_deref(), PolicyPreset::Default)?;
    let guardian = Guardian::from_policy(policy)?;
    let families = match test {
        Some(name) => vec![parse_family(&name)?],
        None => TestFamily::ALL.to_vec(),
    };
    for family in families {
        let assumptions = guardian.requirements(family)?;
        let names: Vec<&str> = assumptions.iter().map(|a| a.as_str()).collect();
        println!(
            "{:<16} {}",
            family.as_str(),
            if names.is_empty() {
                "(none)".to_string()
            } else {
                names.join(", ")
            }
        );
    }
    Ok(())
}

fn show_policy(policy: Option<PathBuf>, preset: PolicyPreset) -> Result<()> {
    let policy = load_policy(policy.as_deref(), preset)?;
    println!("# fingerprint: {}", policy.fingerprint());
    print!("{}", policy.to_toml_string()?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    match args.command {
        Command::Evaluate {
            test,
            input,
            alpha,
            policy,
            preset,
            deadline_ms,
            format,
        } => {
            let code = evaluate(test, input, alpha, policy, preset, deadline_ms, format)?;
            if code != 0 {
                std::io::stdout().flush()?;
                std::process::exit(code);
            }
        }
        Command::Diagnostics {
            input,
            test,
            policy,
        } => diagnostics(input, test, policy)?,
        Command::Requirements { test, policy } => requirements(test, policy)?,
        Command::Policy { policy, preset } => show_policy(policy, preset)?,
    }

    Ok(())
}
