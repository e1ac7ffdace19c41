use log::{error, info};
use pillar_core::auth::HttpIdentityVerifier;
use pillar_core::example_gen::GatewayExampleGenerator;
use pillar_edge::{build_router, AppState, EdgeConfig};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match EdgeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("pillar_edge: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = config.logging.init() {
        eprintln!("pillar_edge: logging disabled: {err}");
    }

    let state = AppState::new(
        Arc::new(HttpIdentityVerifier::new(
            config.identity_url.as_str(),
            config.identity_api_key.as_str(),
        )),
        Arc::new(GatewayExampleGenerator::new(
            config.gateway_url.as_str(),
            config.gateway_key.as_str(),
            config.model.as_str(),
        )),
    );

    let listener = match tokio::net::TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("event=edge_start module=edge status=error addr={} error={}", config.addr, err);
            eprintln!("pillar_edge: cannot bind {}: {err}", config.addr);
            return ExitCode::FAILURE;
        }
    };
    info!("event=edge_start module=edge status=ok addr={}", config.addr);
    println!("pillar_edge listening on {}", config.addr);

    if let Err(err) = axum::serve(listener, build_router(state)).await {
        error!("event=edge_serve module=edge status=error error={err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
