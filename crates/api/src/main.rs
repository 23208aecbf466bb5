//! Safety-Analytics Pipeline - Main Entry Point

use api::{init_logging, run_server};
use dispatch::{MqttNotifier, Notifier};
use pipeline::{Pipeline, PipelineConfig};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== GuardianEye Safety Analytics v{} ===", env!("CARGO_PKG_VERSION"));

    let config = PipelineConfig::load()?;
    info!("Monitoring location: {}", config.location);

    let notifier: Arc<dyn Notifier> = Arc::new(MqttNotifier::connect(&config.notifier).await?);
    let mut pipeline = Pipeline::new(&config, notifier)?;
    let handle = pipeline.handle();

    let api_addr = config.api_addr.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = run_server(&api_addr, handle).await {
            error!("API server failed: {}", e);
        }
    });

    let mut source = config.source.build()?;
    source.connect()?;
    let result = pipeline.run(source.as_mut()).await;
    if let Err(e) = &result {
        error!("Pipeline stopped: {}", e);
    }

    server.abort();
    Ok(result?)
}
