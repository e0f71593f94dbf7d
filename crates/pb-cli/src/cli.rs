use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pb",
    about = "Puppet bridge diagnostics: identifier codecs and configuration checks",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Encode a remote id into the identifier-safe alphabet
    EncodeId(IdArgs),
    /// Decode an encoded id back into the remote id
    DecodeId(IdArgs),
    /// Build the suffix for a puppet and remote id
    Suffix(SuffixArgs),
    /// Split a suffix into puppet and remote id
    ParseSuffix(ParseSuffixArgs),
    /// Parse and validate a bridge configuration file
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
pub struct IdArgs {
    pub id: String,
}

#[derive(Args)]
pub struct SuffixArgs {
    /// Puppet id; -1 addresses the shared bucket
    #[arg(allow_negative_numbers = true)]
    pub puppet: i64,
    pub id: String,
    /// Treat the global namespace as enabled
    #[arg(long)]
    pub global: bool,
}

#[derive(Args)]
pub struct ParseSuffixArgs {
    pub suffix: String,
    /// Treat the global namespace as enabled
    #[arg(long)]
    pub global: bool,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    pub path: PathBuf,
    /// Print the effective configuration, defaults included
    #[arg(long)]
    pub show: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_encode_id() {
        let cli = Cli::try_parse_from(["pb", "encode-id", "Hello World"]).unwrap();
        if let Command::EncodeId(args) = cli.command {
            assert_eq!(args.id, "Hello World");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_suffix_for_shared_bucket() {
        let cli = Cli::try_parse_from(["pb", "suffix", "-1", "fox", "--global"]).unwrap();
        if let Command::Suffix(args) = cli.command {
            assert_eq!(args.puppet, -1);
            assert_eq!(args.id, "fox");
            assert!(args.global);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_suffix_defaults() {
        let cli = Cli::try_parse_from(["pb", "parse-suffix", "1_fox"]).unwrap();
        if let Command::ParseSuffix(args) = cli.command {
            assert!(!args.global);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_check_config() {
        let cli = Cli::try_parse_from(["pb", "-v", "check-config", "bridge.toml", "--show"]).unwrap();
        assert!(cli.verbose);
        if let Command::CheckConfig(args) = cli.command {
            assert_eq!(args.path, PathBuf::from("bridge.toml"));
            assert!(args.show);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn suffix_requires_puppet_and_id() {
        assert!(Cli::try_parse_from(["pb", "suffix", "1"]).is_err());
        assert!(Cli::try_parse_from(["pb", "suffix", "one", "fox"]).is_err());
    }
}
