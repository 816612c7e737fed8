//! The `rigger` binary
//!
//! `rigger run` executes a deployment script (dry or real),
//! `rigger validate` checks one without running it, `rigger deps`
//! parses a dependency manifest and prints canonical specifiers.

use anyhow::{bail, Context as _};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use rigger_actors::{run_script, Registry};
use rigger_script::{Manifest, TokenMap};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn script_arg() -> Arg {
    Arg::new("script")
        .long("script")
        .short('s')
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Deployment script (JSON or YAML)")
}

fn manifest_arg() -> Arg {
    Arg::new("manifest")
        .long("manifest")
        .value_parser(value_parser!(PathBuf))
        .help("Dependency manifest to preflight-parse")
}

fn cli() -> Command {
    Command::new("rigger")
        .version("0.1.0")
        .about("Asynchronous actor-based deployment orchestration")
        .arg_required_else_help(true)
        .arg(
            Arg::new("level")
                .long("level")
                .global(true)
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .default_value("info")
                .help("Log level (RUST_LOG overrides)"),
        )
        .subcommand(
            Command::new("run")
                .about("Execute a deployment script")
                .arg(script_arg())
                .arg(
                    Arg::new("dry")
                        .long("dry")
                        .short('d')
                        .action(ArgAction::SetTrue)
                        .help("Walk the actor tree without mutating anything"),
                )
                .arg(
                    Arg::new("token")
                        .long("token")
                        .short('t')
                        .action(ArgAction::Append)
                        .value_name("KEY=VALUE")
                        .help("Script token override (repeatable)"),
                )
                .arg(manifest_arg()),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a script (and optional manifest) without running")
                .arg(script_arg())
                .arg(
                    Arg::new("token")
                        .long("token")
                        .short('t')
                        .action(ArgAction::Append)
                        .value_name("KEY=VALUE")
                        .help("Script token override (repeatable)"),
                )
                .arg(manifest_arg()),
        )
        .subcommand(
            Command::new("deps")
                .about("Parse a dependency manifest and print canonical specifiers")
                .arg(
                    Arg::new("manifest")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Manifest file"),
                ),
        )
}

fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn parse_tokens(matches: &ArgMatches) -> anyhow::Result<TokenMap> {
    let mut tokens = TokenMap::new();
    if let Some(values) = matches.get_many::<String>("token") {
        for value in values {
            let Some((key, val)) = value.split_once('=') else {
                bail!("token \"{value}\" is not KEY=VALUE");
            };
            if key.is_empty() {
                bail!("token \"{value}\" has an empty key");
            }
            tokens.insert(key.to_string(), val.to_string());
        }
    }
    Ok(tokens)
}

fn preflight_manifest(matches: &ArgMatches) -> anyhow::Result<()> {
    let Some(path) = matches.get_one::<PathBuf>("manifest") else {
        return Ok(());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest =
        Manifest::parse(&text).with_context(|| format!("invalid manifest {}", path.display()))?;
    tracing::info!(
        manifest = %path.display(),
        dependencies = manifest.specs().len(),
        "manifest parsed"
    );
    Ok(())
}

async fn cmd_run(matches: &ArgMatches) -> anyhow::Result<()> {
    preflight_manifest(matches)?;

    let path = matches
        .get_one::<PathBuf>("script")
        .expect("script is required");
    let tokens = parse_tokens(matches)?;
    let dry = matches.get_flag("dry");

    let script = rigger_script::load(path, &tokens)?;
    let registry = Registry::with_default_transport();

    run_script(&registry, &script, dry).await?;
    Ok(())
}

fn cmd_validate(matches: &ArgMatches) -> anyhow::Result<()> {
    preflight_manifest(matches)?;

    let path = matches
        .get_one::<PathBuf>("script")
        .expect("script is required");
    let tokens = parse_tokens(matches)?;

    let script = rigger_script::load(path, &tokens)?;
    tracing::info!(
        script = %script.path.display(),
        root = %script.root.actor,
        "script is valid"
    );
    Ok(())
}

fn cmd_deps(matches: &ArgMatches) -> anyhow::Result<()> {
    let path = matches
        .get_one::<PathBuf>("manifest")
        .expect("manifest is required");
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest =
        Manifest::parse(&text).with_context(|| format!("invalid manifest {}", path.display()))?;

    for spec in manifest.specs() {
        println!("{spec}");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    let level = matches
        .get_one::<String>("level")
        .map(String::as_str)
        .unwrap_or("info");
    init_logging(level);

    let result = match matches.subcommand() {
        Some(("run", sub)) => cmd_run(sub).await,
        Some(("validate", sub)) => cmd_validate(sub),
        Some(("deps", sub)) => cmd_deps(sub),
        _ => Ok(()),
    };

    if let Err(e) = result {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}
