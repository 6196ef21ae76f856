use std::sync::Arc;

use comissoes::{
    api_config_from_env, dashboard_addr_from_env, dashboard_router, init_logging, log_app_bind,
    log_app_start, log_upstream_selected, logging_config_from_env, ComissoesApi,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);

    let api_cfg = api_config_from_env()?;
    log_upstream_selected(&api_cfg.base_url, api_cfg.retry.retries, api_cfg.timeout_ms);
    let api = Arc::new(ComissoesApi::from_config(&api_cfg)?);

    let addr = dashboard_addr_from_env()?;
    let app = dashboard_router(api);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    log_app_bind(bound_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
