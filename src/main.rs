mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::{str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use db::db::DBClient;
use dotenv::dotenv;
use routes::create_router;
use service::{
    ai_service::{AiService, GeminiClient},
    background_jobs,
    chat_service::ChatService,
    escrow_service::{EscrowService, SettlementPolicy},
    google_oauth::GoogleAuthService,
    live::LiveHub,
    notification_service::NotificationService,
    phone_auth::PhoneAuthService,
    task_service::TaskService,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

const OUTBOUND_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub live: Arc<LiveHub>,
    pub notification_service: Arc<NotificationService>,
    pub task_service: Arc<TaskService>,
    pub escrow_service: Arc<EscrowService>,
    pub chat_service: Arc<ChatService>,
    pub ai_service: Arc<AiService>,
    pub google_auth: Arc<GoogleAuthService>,
    pub phone_auth: Arc<PhoneAuthService>,
}

impl AppState {
    pub fn new(env: Config, pool: PgPool) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(OUTBOUND_HTTP_TIMEOUT)
            .build()
            .context("failed to build the HTTP client")?;

        let db_client = Arc::new(DBClient::new(pool));
        let live = Arc::new(LiveHub::default());

        let notification_service = Arc::new(NotificationService::new(
            db_client.clone(),
            live.clone(),
        ));
        let task_service = Arc::new(TaskService::new(
            db_client.clone(),
            notification_service.clone(),
            live.clone(),
        ));
        let escrow_service = Arc::new(EscrowService::new(
            db_client.clone(),
            notification_service.clone(),
            live.clone(),
            SettlementPolicy::new(env.settlement_includes_tip),
        ));
        let chat_service = Arc::new(ChatService::new(db_client.clone(), live.clone()));

        let gemini = GeminiClient::new(
            http.clone(),
            env.gemini_api_key.clone(),
            env.gemini_model.clone(),
        );
        let ai_service = Arc::new(AiService::new(Arc::new(gemini)));

        let google_auth = Arc::new(GoogleAuthService::new(
            http.clone(),
            env.google_client_id.clone(),
        ));
        let phone_auth = Arc::new(PhoneAuthService::new(
            db_client.clone(),
            http,
            env.recaptcha_secret.clone(),
            env.sms_gateway_url.clone(),
        ));

        Ok(AppState {
            env,
            db_client,
            live,
            notification_service,
            task_service,
            escrow_service,
            chat_service,
            ai_service,
            google_auth,
            phone_auth,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::init()?;

    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::DEBUG))
        .init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let app_state = Arc::new(AppState::new(config.clone(), pool)?);

    app_state
        .db_client
        .run_migrations()
        .await
        .context("failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    if app_state.env.google_client_id.is_none() {
        tracing::warn!("GOOGLE_CLIENT_ID is not set, Google sign-in is disabled");
    }

    let allowed_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT]);

    tokio::spawn(background_jobs::start_otp_cleanup_job(app_state.clone()));

    let app = create_router(app_state).layer(cors);

    tracing::info!("🚀 Server is running on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;

    axum::serve(listener, app).await?;

    Ok(())
}
