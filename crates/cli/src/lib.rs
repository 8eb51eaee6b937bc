use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gpux")]
#[command(about = "GPU rental index - weighted A100 hourly price aggregation")]
#[command(version)]
pub struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Expose Prometheus metrics on this port
    #[arg(long, global = true, env = "GPUX_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the index from collector outputs and write the report
    Compute {
        /// Path to the configuration file
        #[arg(short, long, default_value = "index_config/index_config.yaml")]
        config: PathBuf,

        /// Collector output directory or a JSON array of price reports
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Report output path (defaults to ingest.report_output)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Gate a computed report against history and commit it
    Push {
        /// Path to the configuration file
        #[arg(short, long, default_value = "index_config/index_config.yaml")]
        config: PathBuf,

        /// Report written by `compute`
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Commit even if the change exceeds the gate threshold
        #[arg(short, long)]
        force: bool,
    },

    /// Compute, write the report, then push it
    Run {
        /// Path to the configuration file
        #[arg(short, long, default_value = "index_config/index_config.yaml")]
        config: PathBuf,

        /// Collector output directory or a JSON array of price reports
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Report output path (defaults to ingest.report_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Commit even if the change exceeds the gate threshold
        #[arg(short, long)]
        force: bool,
    },

    /// Show recently committed index values
    History {
        /// Path to the configuration file
        #[arg(short, long, default_value = "index_config/index_config.yaml")]
        config: PathBuf,

        /// Number of records to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Validate configuration without computing anything
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "index_config/index_config.yaml")]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "index_config.yaml")]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable with colors
    Pretty,
    /// JSON lines
    Json,
    /// Single-line
    Compact,
}

impl LogFormatArg {
    /// Name accepted by `observability::LogFormat`'s `FromStr`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormatArg::Pretty => "pretty",
            LogFormatArg::Json => "json",
            LogFormatArg::Compact => "compact",
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_with_force() {
        let cli = Cli::try_parse_from([
            "gpux", "run", "--config", "cfg.yaml", "--input", "out/", "--force",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                config,
                input,
                output,
                force,
            } => {
                assert_eq!(config, PathBuf::from("cfg.yaml"));
                assert_eq!(input, Some(PathBuf::from("out/")));
                assert_eq!(output, None);
                assert!(force);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["gpux", "history", "--log-format", "json", "--limit", "3"])
            .unwrap();

        assert_eq!(cli.log_format, LogFormatArg::Json);
        assert!(matches!(cli.command, Commands::History { limit: 3, .. }));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        assert!(Cli::try_parse_from(["gpux", "--log-format", "xml", "validate"]).is_err());
    }

    #[test]
    fn test_log_format_names_match_flag_values() {
        for format in LogFormatArg::value_variants() {
            let value = format.to_possible_value().unwrap();
            assert_eq!(format.as_str(), value.get_name());
        }
    }
}
