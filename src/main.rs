use std::sync::Arc;

use tokio::signal;
use tracing::info;
use warp::Filter;

use conference_core::coordinator::RoomCoordinator;
use conference_core::facade::{MediasoupFacade, SfuFacade};
use conference_core::health::HealthState;
use conference_core::room::RoomRegistry;
use conference_core::{config, gateway, logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::validate_env().unwrap_or_else(|e| {
        eprintln!("Environment validation failed: {}", e);
        std::process::exit(1);
    });

    logging::init(&cfg.rust_log);
    metrics::register_metrics();

    let facade = Arc::new(MediasoupFacade::new(&cfg));
    if let Err(e) = facade.init().await {
        tracing::error!(error = %e, "failed to initialize sfu facade");
        std::process::exit(1);
    }

    let health = HealthState::new();
    health.mark_ready();

    let registry = Arc::new(RoomRegistry::new());
    let coordinator = Arc::new(RoomCoordinator::new(registry, facade.clone()));

    let ws_route = {
        let coordinator = coordinator.clone();
        warp::path("ws").and(warp::ws()).map(move |ws: warp::ws::Ws| {
            let coordinator = coordinator.clone();
            ws.on_upgrade(move |socket| gateway::handle_connection(socket, coordinator))
        })
    };

    let healthz_route = {
        let health = health.clone();
        warp::path("healthz").and(warp::get()).map(move || {
            if health.is_ready() {
                warp::reply::with_status("ok", warp::http::StatusCode::OK)
            } else {
                warp::reply::with_status(
                    "not ready",
                    warp::http::StatusCode::SERVICE_UNAVAILABLE,
                )
            }
        })
    };

    let routes = ws_route.or(healthz_route);

    let bind_ip: std::net::IpAddr = cfg
        .bind_addr
        .parse()
        .unwrap_or_else(|_| "0.0.0.0".parse().unwrap());
    let addr = (bind_ip, cfg.http_port);

    let metrics_handle = tokio::spawn(async move {
        let metrics_route = warp::path("metrics").and(warp::get()).map(|| {
            use prometheus::Encoder;
            let encoder = prometheus::TextEncoder::new();
            let mut buffer = vec![];
            let metric_families = prometheus::gather();
            encoder.encode(&metric_families, &mut buffer).unwrap();
            String::from_utf8(buffer).unwrap()
        });

        info!(addr = ?(bind_ip, cfg.metrics_port), "metrics server listening");
        warp::serve(metrics_route)
            .run((bind_ip, cfg.metrics_port))
            .await;
    });

    info!(addr = ?addr, "signaling server listening");

    let shutdown_signal = async {
        signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C signal handler");
        info!("received shutdown signal (SIGINT/SIGTERM)");
    };

    let (_addr, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, shutdown_signal);
    server.await;

    info!("shutting down - releasing sfu resources");
    facade.shutdown().await;
    metrics_handle.abort();
    info!("shutdown complete");

    Ok(())
}
