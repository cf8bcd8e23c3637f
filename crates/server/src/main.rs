use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use certward_core::{
    create_audit_system, load_config, validate_config, AcmeProvider, AuditEvent, AuditStore,
    BindingAdmin, CertificateRequester, CertificateStore, HttpVaultClient, ManagedItemStore,
    PemCertificateStore, RenewalPolicy, RenewalScheduler, RenewalService, SqliteAuditStore,
    SqliteItemStore, WebrootBindingAdmin,
};
use certward_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffer size for audit event channel
const AUDIT_BUFFER_SIZE: usize = 1000;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("CERTWARD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Vault sidecar: {}", config.vault.url);

    // Compute config hash for audit
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    let config_hash_short = &config_hash[..16];

    // Create SQLite audit store
    let audit_store: Arc<dyn AuditStore> = Arc::new(
        SqliteAuditStore::new(&config.database.path).context("Failed to create audit store")?,
    );
    info!("Audit store initialized");

    // Create SQLite item store
    let items: Arc<dyn ManagedItemStore> = Arc::new(
        SqliteItemStore::new(&config.database.path).context("Failed to create item store")?,
    );
    info!("Item store initialized");

    // Create audit system
    let (audit_handle, audit_writer) =
        create_audit_system(Arc::clone(&audit_store), AUDIT_BUFFER_SIZE);

    // Spawn audit writer task
    let writer_handle = tokio::spawn(audit_writer.run());

    // Emit ServiceStarted event
    audit_handle
        .emit(AuditEvent::ServiceStarted {
            version: VERSION.to_string(),
            config_hash: config_hash_short.to_string(),
        })
        .await;
    info!("Emitted ServiceStarted audit event");

    // Collaborators
    let provider: Arc<dyn AcmeProvider> = Arc::new(
        HttpVaultClient::new(config.vault.clone()).context("Failed to create vault client")?,
    );
    let binding: Arc<dyn BindingAdmin> = Arc::new(
        WebrootBindingAdmin::new(config.webroot.clone())
            .context("Failed to create webroot binding admin")?,
    );
    let cert_store: Arc<dyn CertificateStore> = Arc::new(PemCertificateStore::new());
    info!(
        "Using provider {} and binding admin {}",
        provider.name(),
        binding.name()
    );

    // Engine
    let requester = Arc::new(
        CertificateRequester::new(provider, Arc::clone(&binding), cert_store, Arc::clone(&items))
            .with_identifier_reuse(config.acme.reuse_identifiers)
            .with_audit(audit_handle.clone()),
    );
    let scheduler = Arc::new(
        RenewalScheduler::new(Arc::clone(&requester), binding, Arc::clone(&items))
            .with_audit(audit_handle.clone()),
    );
    let renewal = Arc::new(RenewalService::new(
        scheduler,
        RenewalPolicy::from(&config.renewal),
        Duration::from_secs(config.renewal.check_interval_secs),
    ));

    if config.renewal.enabled {
        renewal.start();
        info!("Renewal service started");
    } else {
        info!("Renewal service disabled in config");
    }

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        audit_handle.clone(),
        audit_store,
        items,
        requester,
        Arc::clone(&renewal),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if config.renewal.enabled {
        info!("Stopping renewal service...");
        renewal.stop();
    }

    // Emit ServiceStopped event
    info!("Server shutting down...");
    audit_handle
        .emit(AuditEvent::ServiceStopped {
            reason: "graceful_shutdown".to_string(),
        })
        .await;

    // Drop all holders of AuditHandle so the writer's channel closes.
    // The renewal service owns the scheduler and requester, which hold clones.
    drop(renewal);
    drop(audit_handle);

    // Wait for writer to finish processing remaining events
    let _ = writer_handle.await;
    info!("Audit writer stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
