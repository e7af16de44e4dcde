use std::ffi::OsString;
use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use docprobe_core::Format;
use docprobe_oci::{OciOptions, REPOSITORY_OVERRIDE_ENV};

use crate::tracing::{LogLevel, TracingFormat};

#[derive(Parser, Debug)]
#[command(name = "docprobe")]
#[command(about = "Find SBOMs, VEX statements and provenance attached to a package")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        visible_alias = "log-level",
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Fetch the documents attached to a package URL")]
    Fetch(FetchArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct FetchArgs {
    #[arg(help = "Package URL, e.g. pkg:oci/curl?repository_url=cgr.dev/chainguard")]
    pub purl: String,

    #[arg(
        long = "format",
        short = 'f',
        help = "Only return documents of this format (repeatable)"
    )]
    pub formats: Vec<Format>,

    #[arg(
        long,
        env = "DOCPROBE_PLATFORM",
        help = "Platform to select from multi-arch images (os/arch[/variant][:osversion])"
    )]
    pub platform: Option<String>,

    #[arg(
        long,
        env = "DOCPROBE_REPOSITORY",
        help = "Registry path used when the purl has no repository_url"
    )]
    pub repository: Option<String>,

    #[arg(
        long,
        env = REPOSITORY_OVERRIDE_ENV,
        help = "Registry path that replaces any other repository setting"
    )]
    pub repository_override: Option<String>,

    #[arg(long, env = "DOCPROBE_CONFIG", help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        conflicts_with = "output_dir",
        help = "Print one `format<TAB>sha256` line per document instead of the bodies"
    )]
    pub list: bool,

    #[arg(long, help = "Write each document to <dir>/<n>.<ext> instead of stdout")]
    pub output_dir: Option<PathBuf>,
}

/// OCI options split by where clap found them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionLayers {
    /// Values given as command line flags.
    pub flags: OciOptions,
    /// Values taken from environment variables.
    pub env: OciOptions,
}

impl OptionLayers {
    /// Merge with config file values: flags, then file, then environment.
    #[must_use]
    pub fn merge(self, file: OciOptions) -> OciOptions {
        self.flags.or(file).or(self.env)
    }
}

impl FetchArgs {
    /// Split the OCI options into flag and environment layers.
    #[must_use]
    pub fn option_layers(&self, matches: &ArgMatches) -> OptionLayers {
        let mut layers = OptionLayers::default();
        let fields = [
            ("platform", &self.platform),
            ("repository", &self.repository),
            ("repository_override", &self.repository_override),
        ];
        for (id, value) in fields {
            let Some(value) = value.clone() else {
                continue;
            };
            let target = match matches.value_source(id) {
                Some(ValueSource::EnvVariable) => &mut layers.env,
                _ => &mut layers.flags,
            };
            match id {
                "platform" => target.platform = Some(value),
                "repository" => target.repository = Some(value),
                _ => target.repository_override = Some(value),
            }
        }
        layers
    }
}

/// Parsed arguments together with the raw matches.
#[derive(Debug)]
pub struct Invocation {
    pub cli: Cli,
    pub matches: ArgMatches,
}

impl Invocation {
    /// Matches of the selected subcommand.
    #[must_use]
    pub fn subcommand_matches(&self) -> &ArgMatches {
        self.matches
            .subcommand()
            .map_or(&self.matches, |(_, matches)| matches)
    }
}

pub fn try_parse_from<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = Cli::command().try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    Ok(Invocation { cli, matches })
}

pub fn parse() -> Invocation {
    try_parse_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PURL: &str = "pkg:oci/curl?repository_url=cgr.dev/chainguard";

    fn env_unset<R>(f: impl FnOnce() -> R) -> R {
        temp_env::with_vars_unset(
            [
                "DOCPROBE_PLATFORM",
                "DOCPROBE_REPOSITORY",
                REPOSITORY_OVERRIDE_ENV,
                "DOCPROBE_CONFIG",
            ],
            f,
        )
    }

    fn fetch_args(inv: &Invocation) -> &FetchArgs {
        let Commands::Fetch(args) = &inv.cli.command;
        args
    }

    #[test]
    fn test_cli_default_values() {
        env_unset(|| {
            let inv = try_parse_from(["docprobe", "fetch", PURL]).unwrap();
            assert!(matches!(inv.cli.level, LogLevel::Warn));
            assert_eq!(inv.cli.log_format, TracingFormat::Compact);

            let args = fetch_args(&inv);
            assert_eq!(args.purl, PURL);
            assert!(args.formats.is_empty());
            assert!(args.platform.is_none());
            assert!(!args.list);
            assert!(args.output_dir.is_none());
        });
    }

    #[test]
    fn test_cli_log_level_parsing() {
        env_unset(|| {
            let inv = try_parse_from(["docprobe", "--level", "debug", "fetch", PURL]).unwrap();
            assert!(matches!(inv.cli.level, LogLevel::Debug));

            let inv = try_parse_from(["docprobe", "fetch", PURL, "-l", "error"]).unwrap();
            assert!(matches!(inv.cli.level, LogLevel::Error));

            let inv = try_parse_from(["docprobe", "--log-level", "info", "fetch", PURL]).unwrap();
            assert!(matches!(inv.cli.level, LogLevel::Info));
        });
    }

    #[test]
    fn test_invalid_log_level() {
        assert!(try_parse_from(["docprobe", "--level", "loud", "fetch", PURL]).is_err());
    }

    #[test]
    fn test_missing_subcommand() {
        assert!(try_parse_from(["docprobe"]).is_err());
    }

    #[test]
    fn test_repeated_formats() {
        env_unset(|| {
            let inv = try_parse_from([
                "docprobe",
                "fetch",
                PURL,
                "--format",
                "text/spdx+json",
                "-f",
                "application/vnd.cyclonedx+json",
            ])
            .unwrap();
            let formats: Vec<&str> = fetch_args(&inv).formats.iter().map(Format::as_str).collect();
            assert_eq!(formats, vec!["text/spdx+json", "application/vnd.cyclonedx+json"]);
        });
    }

    #[test]
    fn test_list_conflicts_with_output_dir() {
        assert!(
            try_parse_from(["docprobe", "fetch", PURL, "--list", "--output-dir", "/tmp/x"])
                .is_err()
        );
    }

    #[test]
    fn test_option_layers_split_flags_and_env() {
        temp_env::with_vars(
            [
                ("DOCPROBE_PLATFORM", Some("linux/amd64")),
                ("DOCPROBE_REPOSITORY", None),
                (REPOSITORY_OVERRIDE_ENV, Some("mirror.example.com")),
                ("DOCPROBE_CONFIG", None),
            ],
            || {
                let inv = try_parse_from([
                    "docprobe",
                    "fetch",
                    PURL,
                    "--repository",
                    "example.io/x",
                ])
                .unwrap();
                let layers = fetch_args(&inv).option_layers(inv.subcommand_matches());

                assert_eq!(layers.flags.repository.as_deref(), Some("example.io/x"));
                assert!(layers.flags.platform.is_none());
                assert_eq!(layers.env.platform.as_deref(), Some("linux/amd64"));
                assert_eq!(
                    layers.env.repository_override.as_deref(),
                    Some("mirror.example.com")
                );
            },
        );
    }

    #[test]
    fn test_merge_precedence() {
        let layers = OptionLayers {
            flags: OciOptions::new().with_platform("linux/arm64"),
            env: OciOptions::new()
                .with_platform("linux/amd64")
                .with_repository("env.io/x")
                .with_repository_override("env.io/ovr"),
        };
        let file = OciOptions::new()
            .with_platform("linux/s390x")
            .with_repository("file.io/x");

        let merged = layers.merge(file);
        assert_eq!(merged.platform.as_deref(), Some("linux/arm64"));
        assert_eq!(merged.repository.as_deref(), Some("file.io/x"));
        assert_eq!(merged.repository_override.as_deref(), Some("env.io/ovr"));
    }
}
