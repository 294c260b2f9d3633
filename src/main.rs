use tinygin::{handler, logger, Config, Engine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let mut engine = Engine::with_config(cfg);
    engine.get("/ping", [handler(|c| c.string(200, "pong"))])?;

    let listener = tinygin::server::bind(&addr.to_string()).await?;
    engine
        .run_until(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                logger::log_error(&format!("Failed to listen for Ctrl-C: {e}"));
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}
