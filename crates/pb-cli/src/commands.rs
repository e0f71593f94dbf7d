use anyhow::Context;
use colored::Colorize;
use pb_namespace::{decode_id, decode_suffix, encode_id, make_suffix};
use pb_sdk::{BridgeConfig, LoggingConfig};
use pb_types::PuppetId;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    // check-config installs logging from the file it checks
    if !matches!(cli.command, Command::CheckConfig(_)) {
        pb_sdk::logging::init(&cli_logging(cli.verbose))?;
    }
    match cli.command {
        Command::EncodeId(args) => {
            println!("{}", encode_id(&args.id));
            Ok(())
        }
        Command::DecodeId(args) => {
            println!("{}", decode_id(&args.id)?);
            Ok(())
        }
        Command::Suffix(args) => {
            println!("{}", suffix(&args)?);
            Ok(())
        }
        Command::ParseSuffix(args) => cmd_parse_suffix(args),
        Command::CheckConfig(args) => cmd_check_config(args, cli.verbose),
    }
}

/// Logging for commands that have no configuration file to read it from.
fn cli_logging(verbose: bool) -> LoggingConfig {
    let mut logging = LoggingConfig::default();
    if verbose {
        logging.level = "debug".into();
    }
    logging
}

fn suffix(args: &SuffixArgs) -> anyhow::Result<String> {
    Ok(make_suffix(PuppetId::new(args.puppet), &args.id, args.global)?)
}

fn describe_puppet(puppet: PuppetId) -> String {
    if puppet.is_global() {
        "shared (global namespace)".to_string()
    } else {
        puppet.to_string()
    }
}

fn cmd_parse_suffix(args: ParseSuffixArgs) -> anyhow::Result<()> {
    let (puppet, remote_id) = decode_suffix(&args.suffix, args.global)
        .with_context(|| format!("cannot parse suffix {:?}", args.suffix))?;
    println!("  Puppet: {}", describe_puppet(puppet).yellow());
    println!("  Remote id: {}", remote_id.cyan());
    Ok(())
}

/// Load and validate a configuration file. `--verbose` raises its log level.
fn check_config(args: &CheckConfigArgs, verbose: bool) -> anyhow::Result<BridgeConfig> {
    let mut config = BridgeConfig::load(&args.path)
        .with_context(|| format!("cannot load {}", args.path.display()))?;
    if verbose {
        config.logging.level = "debug".into();
    }
    config.validate()?;
    Ok(config)
}

fn cmd_check_config(args: CheckConfigArgs, verbose: bool) -> anyhow::Result<()> {
    let config = match check_config(&args, verbose) {
        Ok(config) => config,
        Err(err) => {
            println!("{} {}", "✗".red().bold(), args.path.display());
            return Err(err);
        }
    };
    // logging follows the checked file's own [logging] section
    pb_sdk::logging::init(&config.logging)?;
    debug!(path = %args.path.display(), "configuration loaded");

    println!("{} {} is valid", "✓".green().bold(), args.path.display());
    let namespace = if config.namespace.enabled {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!("  Global namespace: {namespace}");
    println!(
        "  Delegate prefix: {}",
        config.users.localpart_prefix.cyan()
    );
    println!("  Lock timeout: {} ms", config.coord.lock_timeout_ms);
    if args.show {
        println!("\n{}", config.to_toml_string()?);
    }
    Ok(())
}
