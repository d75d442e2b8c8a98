use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use gift_advisor::config::AppConfig;
use gift_advisor::credits::CreditLedger;
use gift_advisor::error::Result;
use gift_advisor::llm::create_provider;
use gift_advisor::quiz::Catalog;
use gift_advisor::recommend::{
    LlmSuggestionGenerator, QuizRouteState, RecommendationOrchestrator, quiz_routes,
};
use gift_advisor::store::LibSqlBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    eprintln!("🎁 Gift Advisor v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Refund policy: {:?}", config.orchestrator.refund_policy);
    eprintln!("   API: http://0.0.0.0:{}/api/quiz/questions\n", config.port);

    let app = build_app(&config)
        .await
        .context("Failed to start services")?
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Gift Advisor server started");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Wire the database, ledger, LLM and orchestrator into the HTTP router.
async fn build_app(config: &AppConfig) -> Result<Router> {
    let llm = create_provider(&config.llm)?;

    // ── Database ─────────────────────────────────────────────────────────
    let db = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);

    // ── Core services ────────────────────────────────────────────────────
    let ledger = Arc::new(CreditLedger::new(db.clone()));
    let generator = Arc::new(LlmSuggestionGenerator::new(
        llm,
        config.orchestrator.temperature,
        config.orchestrator.max_tokens,
    ));
    let orchestrator = Arc::new(RecommendationOrchestrator::new(
        ledger.clone(),
        generator,
        db.clone(),
        Catalog::gift_quiz(),
        config.orchestrator.clone(),
    ));

    // Log balance changes as they commit.
    let mut balances = ledger.subscribe();
    tokio::spawn(async move {
        loop {
            match balances.recv().await {
                Ok(change) => {
                    tracing::debug!(user_id = %change.user_id, balance = change.balance, "Balance changed");
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Balance listener lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    Ok(quiz_routes(QuizRouteState {
        orchestrator,
        searches: db,
        initial_credits: config.initial_credits,
    }))
}
