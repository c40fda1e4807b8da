use crate::{
    axum_http::{
        default_routers,
        routers::{self, provider_webhooks::WebhookState, visio::VisioRoutesState},
    },
    config::config_model::{DotEnvyConfig, StorageBackend},
    usecases::{
        avatars::AvatarUseCase,
        clips::ClipUseCase,
        credit_ledger::CreditLedger,
        plan_resolver::PlanResolver,
        rendering::VideoRenderer,
        speech_pipeline::SpeechPipeline,
        turn_orchestrator::{TurnOrchestrator, TurnSettings},
        usage_ledger::UsageLedger,
        visio_sessions::VisioSessionUseCase,
    },
};
use anyhow::{Context, Result};
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use crates::{
    domain::repositories::{
        avatar_assets::AvatarAssetRepository, credits::CreditRepository,
        subscriptions::SubscriptionRepository, usages::UsageRepository,
        visio_sessions::VisioSessionRepository,
    },
    infra::{
        db::{
            postgres::postgres_connection::{self, PgPoolSquad},
            repositories::{
                avatar_assets::AvatarAssetPostgres, credits::CreditPostgres,
                subscriptions::SubscriptionPostgres, usages::UsagePostgres,
                visio_sessions::VisioSessionPostgres,
            },
        },
        language_models::anthropic::AnthropicClient,
        memory::{
            avatar_assets::AvatarAssetMemory, credits::CreditMemory,
            subscriptions::SubscriptionMemory, usages::UsageMemory,
            visio_sessions::VisioSessionMemory,
        },
        speech::elevenlabs::ElevenLabsClient,
        storages::supabase_storage::{SupabaseStorageClient, SupabaseStorageConfig},
    },
    providers::{ProviderSettings, build_provider},
    reconcilers::{ReconcilePolicies, ReconcilePolicy, job_registry::JobRegistry},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Every repository behind its trait, so storage is picked once at startup.
pub struct Repositories {
    pub usages: Arc<dyn UsageRepository + Send + Sync>,
    pub credits: Arc<dyn CreditRepository + Send + Sync>,
    pub subscriptions: Arc<dyn SubscriptionRepository + Send + Sync>,
    pub sessions: Arc<dyn VisioSessionRepository + Send + Sync>,
    pub avatars: Arc<dyn AvatarAssetRepository + Send + Sync>,
}

impl Repositories {
    pub fn postgres(db_pool: Arc<PgPoolSquad>) -> Self {
        Self {
            usages: Arc::new(UsagePostgres::new(Arc::clone(&db_pool))),
            credits: Arc::new(CreditPostgres::new(Arc::clone(&db_pool))),
            subscriptions: Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool))),
            sessions: Arc::new(VisioSessionPostgres::new(Arc::clone(&db_pool))),
            avatars: Arc::new(AvatarAssetPostgres::new(db_pool)),
        }
    }

    pub fn memory() -> Self {
        Self {
            usages: Arc::new(UsageMemory::new()),
            credits: Arc::new(CreditMemory::new()),
            subscriptions: Arc::new(SubscriptionMemory::new()),
            sessions: Arc::new(VisioSessionMemory::new()),
            avatars: Arc::new(AvatarAssetMemory::new()),
        }
    }

    pub fn from_config(config: &DotEnvyConfig) -> Result<Self> {
        match config.storage.backend {
            StorageBackend::Postgres => {
                let database_url = config
                    .storage
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL is required when STORAGE_BACKEND=postgres")?;
                let db_pool = postgres_connection::establish_connection(database_url)?;
                info!("Postgres connection has been established");
                Ok(Self::postgres(Arc::new(db_pool)))
            }
            StorageBackend::Memory => {
                warn!("http_serve: using in-memory storage, data is lost on restart");
                Ok(Self::memory())
            }
        }
    }
}

pub async fn start(config: Arc<DotEnvyConfig>, repositories: Repositories) -> Result<()> {
    let registry = Arc::new(JobRegistry::new());
    let provider = build_provider(
        &ProviderSettings {
            kind: config.video_provider.kind,
            api_key: config.video_provider.api_key.clone(),
            public_base_url: config.video_provider.public_base_url.clone(),
            use_webhook: config.video_provider.use_webhook,
        },
        Arc::clone(&registry),
    )?;

    let reconciler = &config.reconciler;
    let max_wait = Duration::from_millis(reconciler.poll_max_wait_ms);
    let policies = ReconcilePolicies {
        polling: ReconcilePolicy::new(Duration::from_millis(reconciler.poll_interval_ms), max_wait),
        webhook: ReconcilePolicy::new(
            Duration::from_millis(reconciler.webhook_poll_interval_ms),
            max_wait,
        ),
    };
    let renderer = Arc::new(VideoRenderer::new(
        Arc::clone(&provider),
        Arc::clone(&registry),
        policies,
    ));

    let speech = Arc::new(SpeechPipeline::new(
        Arc::new(ElevenLabsClient::new(config.speech.elevenlabs_api_key.clone())),
        Arc::new(AnthropicClient::new(
            config.language_model.anthropic_api_key.clone(),
            config.language_model.model.clone(),
        )),
        Arc::new(ElevenLabsClient::new(config.speech.elevenlabs_api_key.clone())),
        Arc::new(SupabaseStorageClient::new(SupabaseStorageConfig {
            project_url: config.supabase.project_url.clone(),
            service_key: config.supabase.service_key.clone(),
            bucket: config.supabase.media_bucket.clone(),
            prefix: String::new(),
        })),
        config.speech.default_voice_id.clone(),
    ));

    let plan_resolver = Arc::new(PlanResolver::new(Arc::clone(&repositories.subscriptions)));
    let usage = Arc::new(UsageLedger::new(
        Arc::clone(&repositories.usages),
        Arc::clone(&plan_resolver),
    ));
    let credits = Arc::new(CreditLedger::new(
        Arc::clone(&repositories.credits),
        Arc::clone(&repositories.subscriptions),
        plan_resolver,
    ));
    let sessions = Arc::new(VisioSessionUseCase::new(
        Arc::clone(&repositories.sessions),
        Arc::clone(&repositories.avatars),
    ));
    let avatars = Arc::new(AvatarUseCase::new(
        Arc::clone(&repositories.avatars),
        Arc::clone(&renderer),
    ));
    let turns = Arc::new(TurnOrchestrator::new(
        Arc::clone(&sessions),
        Arc::clone(&usage),
        Arc::clone(&repositories.avatars),
        Arc::clone(&speech),
        Arc::clone(&renderer),
        TurnSettings {
            resolution: config.video_provider.default_resolution,
            fallback_clip_seconds: reconciler.fallback_clip_seconds,
        },
    ));
    let clips = Arc::new(ClipUseCase::new(
        Arc::clone(&credits),
        Arc::clone(&repositories.avatars),
        speech,
        renderer,
    ));

    spawn_registry_sweeper(
        Arc::clone(&registry),
        Duration::from_secs(reconciler.job_registry_ttl_secs),
    );

    let app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/visio",
            routers::visio::routes(VisioRoutesState {
                sessions,
                turns,
                avatars,
                usage,
            }),
        )
        .nest("/api/v1/credits", routers::credits::routes(credits))
        .nest("/api/v1/clips", routers::clips::routes(clips))
        .nest(
            "/api/v1/webhooks",
            routers::provider_webhooks::routes(WebhookState { provider, registry }),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Drops registry entries left behind by turns that timed out.
fn spawn_registry_sweeper(registry: Arc<JobRegistry>, ttl: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ttl.max(Duration::from_secs(1)));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            registry.evict_older_than(ttl);
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = first_signal(ctrl_c, terminate).await;
    info!(signal, "Shutting down");
}

async fn first_signal(
    ctrl_c: impl std::future::Future<Output = ()>,
    terminate: impl std::future::Future<Output = ()>,
) -> &'static str {
    tokio::select! {
        _ = ctrl_c => "ctrl_c",
        _ = terminate => "terminate",
    }
}
