use {
    std::{
        fmt::{self, Display, Formatter},
        path::PathBuf,
        time::Duration,
    },
    url::Url,
};

/// Deploys a compiled contract and records its address for a front-end.
///
/// Every option can also be given through the environment or a TOML config
/// file. Command line and environment take precedence over the file.
#[derive(Debug, clap::Parser)]
#[clap(name = "deploy-contract")]
pub struct Arguments {
    /// Path to a TOML file with the deployment configuration.
    #[clap(long, env)]
    pub config: Option<PathBuf>,

    /// The Ethereum node URL to connect to [default: http://127.0.0.1:8545].
    #[clap(long, env)]
    pub node_url: Option<Url>,

    /// Hex encoded private key of the deploying account. Without it the
    /// transaction is signed by the node with its first unlocked account.
    #[clap(long, env, hide_env_values = true)]
    pub private_key: Option<String>,

    /// Chain ID the node is expected to report. The deployment aborts before
    /// submitting anything if the node is on a different chain.
    #[clap(long, env)]
    pub chain_id: Option<u64>,

    /// Path to the compiled contract artifact (Hardhat or Foundry JSON).
    #[clap(long, env)]
    pub artifact: Option<PathBuf>,

    /// Path of the JSON file the deployment result is written to.
    #[clap(long, env)]
    pub output: Option<PathBuf>,

    /// Whether the contract ABI is written to the output file [default: true].
    #[clap(long, env)]
    pub include_abi: Option<bool>,

    /// Hex encoded constructor arguments appended to the creation bytecode.
    #[clap(long, env)]
    pub constructor_args: Option<String>,

    /// Number of confirmations to wait for before the deployment counts as
    /// done [default: 1].
    #[clap(long, env)]
    pub confirmations: Option<u64>,

    /// How long to wait for the confirmations [default: 60s].
    #[clap(long, env, value_parser = humantime::parse_duration)]
    pub confirmation_timeout: Option<Duration>,

    #[clap(long, env, default_value = "warn,contract_deployer=info,observe=info")]
    pub log_filter: String,

    /// At which log level logs should be printed to stderr instead of stdout.
    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: tracing::Level,

    /// Whether to use JSON format for the logs.
    #[clap(long, env, default_value = "false")]
    pub use_json_logs: bool,
}

impl Display for Arguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            config,
            node_url,
            private_key,
            chain_id,
            artifact,
            output,
            include_abi,
            constructor_args,
            confirmations,
            confirmation_timeout,
            log_filter,
            log_stderr_threshold,
            use_json_logs,
        } = self;

        display_option(f, "config", &config.as_ref().map(|p| p.display()))?;
        display_option(f, "node_url", node_url)?;
        display_secret_option(f, "private_key", private_key)?;
        display_option(f, "chain_id", chain_id)?;
        display_option(f, "artifact", &artifact.as_ref().map(|p| p.display()))?;
        display_option(f, "output", &output.as_ref().map(|p| p.display()))?;
        display_option(f, "include_abi", include_abi)?;
        display_option(f, "constructor_args", constructor_args)?;
        display_option(f, "confirmations", confirmations)?;
        display_option(
            f,
            "confirmation_timeout",
            &confirmation_timeout.map(humantime::format_duration),
        )?;
        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_stderr_threshold: {log_stderr_threshold}")?;
        writeln!(f, "use_json_logs: {use_json_logs}")?;
        Ok(())
    }
}

pub fn display_secret_option<T>(
    f: &mut Formatter<'_>,
    name: &str,
    option: &Option<T>,
) -> fmt::Result {
    display_option(f, name, &option.as_ref().map(|_| "SECRET"))
}

pub fn display_option(
    f: &mut Formatter<'_>,
    name: &str,
    option: &Option<impl Display>,
) -> fmt::Result {
    write!(f, "{name}: ")?;
    match option {
        Some(display) => writeln!(f, "{display}"),
        None => writeln!(f, "None"),
    }
}
