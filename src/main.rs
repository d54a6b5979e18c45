#![warn(unused_crate_dependencies)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use log::{error, info};
use tokio::signal;

use crate::config::load_config;
use crate::identity::to_symbol;
use crate::state::AppState;

mod admin;
mod allocator;
mod builder;
mod codec;
mod config;
mod cycle;
mod dispatch;
mod env;
mod errors;
mod external;
mod finder;
mod handlers;
mod identity;
mod join;
mod lobby;
mod logging;
mod matchmaker;
mod net;
mod presence;
mod registry;
mod session;
mod state;

/// Default level pools used until a real content pipeline feeds the
/// rotation (spec.md §4.8.2); one placeholder level per mode is enough
/// to keep the rotation logic exercised end to end.
fn default_level_pools() -> std::collections::HashMap<identity::Symbol, Vec<identity::Symbol>> {
    let mut pools = std::collections::HashMap::new();
    pools.insert(to_symbol("arena_public"), vec![to_symbol("dyson_dc"), to_symbol("tempest_dc")]);
    pools.insert(to_symbol("combat_public"), vec![to_symbol("dyson_combat_dc")]);
    pools.insert(to_symbol("social_public"), vec![to_symbol("the_plaza")]);
    pools
}

fn resolve_external_ip() -> Ipv4Addr {
    match local_ip_address::local_ip() {
        Ok(IpAddr::V4(ip)) => ip,
        _ => Ipv4Addr::UNSPECIFIED,
    }
}

#[tokio::main]
async fn main() {
    let config = load_config();
    logging::setup();
    log_panics::init();

    let node = format!("{}-{}", env::str_env(env::EXT_HOST), std::process::id());
    let external_ip = resolve_external_ip();

    info!("starting relay (v{}) as node {node}, advertising external ip {external_ip}", crate::config::VERSION);

    let state = Arc::new(AppState::new_with_dev_collaborators(config.clone(), node, external_ip, default_level_pools()));

    let main_addr = SocketAddr::new(config.server.host, config.server.port);
    let admin_addr = SocketAddr::new(config.server.admin_bind, config.server.admin_port);

    let tcp_state = state.clone();
    let tcp_task = tokio::spawn(async move {
        if let Err(err) = net::run_tcp_server(tcp_state, main_addr).await {
            error!("main tcp server exited: {err:?}");
        }
    });

    let cycle_task = tokio::spawn(cycle::run_matchmaker_cycle(state.clone()));

    let admin_state = state.clone();
    let admin_task = tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(admin_addr).await {
            Ok(listener) => listener,
            Err(err) => {
                error!("failed to bind admin http server on {admin_addr}: {err:?}");
                return;
            }
        };
        info!("admin http surface listening on {admin_addr}");
        if let Err(err) = axum::serve(listener, admin::router(admin_state))
            .with_graceful_shutdown(async {
                let _ = signal::ctrl_c().await;
            })
            .await
        {
            error!("admin http server error: {err:?}");
        }
    });

    let _ = signal::ctrl_c().await;
    info!("shutdown signal received, stopping background tasks");
    tcp_task.abort();
    cycle_task.abort();
    admin_task.abort();
}
