use anyhow::Context;
use bloom::kernel::config::load_config;
use bloom_logger::Logger;
use bloom_server::Server;

#[bloom_runtime::main(high_performance)]
async fn main() -> anyhow::Result<()> {
    let _log = Logger::builder().name(env!("CARGO_PKG_NAME")).init()?;

    let cfg = load_config(Some("server")).context("Critical: Configuration is malformed")?;

    Server::builder().config(cfg).build().await?.run().await
}
