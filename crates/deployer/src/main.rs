#[tokio::main]
async fn main() -> std::process::ExitCode {
    contract_deployer::run::start(std::env::args()).await
}
