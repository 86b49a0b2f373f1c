use anyhow::{Context, Result};
use dutch_escrow::{
    config::Config,
    event_log,
    service::{self, event_tail::EventTail, http::HttpService},
    AuctionHouse,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log).context("invalid log filter")?)
        .init();
    info!(?config, "starting");

    let (notifier, event_reader) = event_log::new_in_memory_shared();
    let house = Arc::new(AuctionHouse::<String>::new(config.auth_policy, notifier));
    let state = service::http::AppState::new(house, event_reader.clone());

    let svc_ctr = service::ServiceControl::new();

    ctrlc::set_handler({
        let svc_ctr = svc_ctr.clone();
        move || {
            eprintln!("Stopping all services...");
            svc_ctr.stop_all();
        }
    })?;

    for handle in vec![
        svc_ctr.spawn_log_follower(EventTail::new(), event_reader, config.event_batch),
        svc_ctr.spawn_loop(HttpService::new(config.listen_addr, state)?),
    ] {
        handle.join()?
    }

    Ok(())
}
