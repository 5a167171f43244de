use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{expand_command_abbrev, known_command_names};
use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "metapilot",
    version,
    about = "Metapilot: automation history and schedule browser",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` (or `rc.key:value`) overrides out of
/// the raw arguments before clap sees them.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> PreprocessedArgs {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest.split_once('=').or_else(|| rest.split_once(':'));
            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((format!("rc.{k}"), v.to_string()));
                continue;
            }
        }

        cleaned.push(arg);
    }

    PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub filter_terms: Vec<String>,
    pub command: String,
    pub command_args: Vec<String>,
}

impl Invocation {
    /// Splits `[FILTER...] COMMAND [ARGS...]` at the first token naming a
    /// command. Without one, every token is a filter for the default command.
    #[tracing::instrument(skip(cfg, rest))]
    pub fn parse(cfg: &Config, rest: Vec<OsString>) -> Self {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();

        let default_command = cfg
            .get("default.command")
            .unwrap_or_else(|| "history".to_string());

        match split_filter_command(&tokens) {
            Some((filter_terms, command, command_args)) => Self {
                filter_terms,
                command,
                command_args,
            },
            None => {
                if !tokens.is_empty() {
                    warn!(
                        command = %default_command,
                        "no command detected, treating all terms as filter"
                    );
                } else {
                    debug!(command = %default_command, "no explicit command, using default");
                }
                Self {
                    filter_terms: tokens,
                    command: default_command,
                    command_args: vec![],
                }
            }
        }
    }
}

fn split_filter_command(tokens: &[String]) -> Option<(Vec<String>, String, Vec<String>)> {
    let known = known_command_names();

    for (i, token) in tokens.iter().enumerate() {
        if token.contains(':') {
            continue;
        }
        if let Some(full) = expand_command_abbrev(token, &known) {
            debug!(
                token = %token,
                expanded = %full,
                split_index = i,
                "resolved command token"
            );
            return Some((
                tokens[..i].to_vec(),
                full.to_string(),
                tokens[i + 1..].to_vec(),
            ));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{GlobalCli, Invocation, preprocess_args};
    use crate::config::Config;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn positional_rc_overrides_are_captured() {
        let pre = preprocess_args(&os(&[
            "metapilot",
            "rc.color=off",
            "rc.history.page_size:3",
            "history",
        ]));
        assert_eq!(pre.cleaned_args, os(&["metapilot", "history"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.history.page_size".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn global_flags_before_rest() {
        let cli = GlobalCli::parse_from(os(&[
            "metapilot",
            "-vv",
            "--rc",
            "color=off",
            "--data",
            "/tmp/mp",
            "status:failed",
            "history",
        ]));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides[0].key, "color");
        assert_eq!(cli.rest, os(&["status:failed", "history"]));
    }

    #[test]
    fn splits_filter_command_and_args() {
        let cfg = Config::default();
        let inv = Invocation::parse(&cfg, os(&["category:swap", "hist", "page:2"]));
        assert_eq!(inv.filter_terms, strings(&["category:swap"]));
        assert_eq!(inv.command, "history");
        assert_eq!(inv.command_args, strings(&["page:2"]));
    }

    #[test]
    fn attribute_values_are_never_commands() {
        let cfg = Config::default();
        let inv = Invocation::parse(&cfg, os(&["status:stats", "export"]));
        assert_eq!(inv.filter_terms, strings(&["status:stats"]));
        assert_eq!(inv.command, "export");
    }

    #[test]
    fn falls_back_to_default_command() {
        let mut cfg = Config::default();
        let inv = Invocation::parse(&cfg, vec![]);
        assert_eq!(inv.command, "history");
        assert!(inv.filter_terms.is_empty());

        cfg.apply_overrides([("default.command".to_string(), "schedule".to_string())]);
        let inv = Invocation::parse(&cfg, os(&["status:paused"]));
        assert_eq!(inv.command, "schedule");
        assert_eq!(inv.filter_terms, strings(&["status:paused"]));
    }
}
