use {
    crate::{
        arguments::Arguments,
        config::Config,
        deploy,
        node::Ethereum,
        output::DeploymentResult,
    },
    anyhow::Context,
    clap::Parser,
    std::process::ExitCode,
};

/// Runs a single deployment with the given command line and reports the
/// outcome through the exit code.
pub async fn start(args: impl Iterator<Item = String>) -> ExitCode {
    let args = Arguments::parse_from(args);
    observe::tracing::initialize(&observe::Config::new(
        &args.log_filter,
        Some(args.log_stderr_threshold),
        args.use_json_logs,
    ));
    tracing::info!("running contract deployer with arguments:\n{}", args);

    match run(&args).await {
        Ok(result) => {
            tracing::info!(
                address = %result.address,
                chain_id = result.chain_id,
                "deployment finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("deployment failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Arguments) -> anyhow::Result<DeploymentResult> {
    let config = Config::resolve(args)
        .await
        .context("invalid configuration")?;
    tracing::info!("resolved configuration:\n{}", config);

    let node = Ethereum::new(&config.node_url, &config.account);
    deploy::run(&node, &config).await.map_err(|err| {
        let kind = err.kind();
        anyhow::Error::new(err).context(format!("{kind} failure"))
    })
}
