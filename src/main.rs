//! Service entry-point: wires configuration, adapters and the HTTP server.

use std::sync::Arc;

use actix_web::{HttpServer, web};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use toolcrib::api::health::HealthState;
use toolcrib::domain::SessionWorkflow;
use toolcrib::domain::ports::DetectionTransport;
use toolcrib::outbound::detect::{AmqpDetectionTransport, HttpDetectionTransport};
use toolcrib::outbound::persistence::{DbPool, DieselSessionStore, PoolConfig};
use toolcrib::outbound::storage::S3BlobStore;
use toolcrib::server::{AppConfig, AppDependencies, DetectConfig, build_app};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    let pool = DbPool::new(PoolConfig::new(config.database_url.clone()))
        .await
        .map_err(std::io::Error::other)?;
    let store = Arc::new(DieselSessionStore::new(pool));

    let transport: Arc<dyn DetectionTransport> = match &config.detect {
        DetectConfig::Amqp(amqp) => {
            let transport = AmqpDetectionTransport::connect(&amqp.url, &amqp.queue, amqp.timeout)
                .await
                .map_err(std::io::Error::other)?;
            info!(queue = %amqp.queue, "detection transport: amqp");
            Arc::new(transport)
        }
        DetectConfig::Http(http) => {
            let transport = HttpDetectionTransport::with_timeout(
                http.endpoint.clone(),
                &http.api_key,
                http.timeout,
            )
            .map_err(std::io::Error::other)?;
            info!(endpoint = %http.endpoint, "detection transport: http");
            Arc::new(transport)
        }
    };

    let blobs = Arc::new(S3BlobStore::new(config.blob_store.clone()).map_err(std::io::Error::other)?);

    let workflow = web::Data::new(SessionWorkflow::new(
        transport,
        store,
        blobs,
        config.class_map.clone(),
    ));
    let health_state = web::Data::new(HealthState::new());

    let deps = AppDependencies {
        health_state: health_state.clone(),
        workflow,
    };
    let server = HttpServer::new(move || build_app(deps.clone())).bind(config.bind_addr)?;

    health_state.mark_ready();
    info!(addr = %config.bind_addr, "listening");
    server.run().await
}
