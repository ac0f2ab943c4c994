use clap::Parser;
use loadhaul::{start_loadhaul_server, CmdArgs};
use loadhaul_utils::error::LoadhaulResult;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> LoadhaulResult<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = CmdArgs::parse();
  start_loadhaul_server(args).await
}
