use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use geopost::auth::{AuthService, CredentialHasher, TokenConfigHandle, TokenEngine};
use geopost::configuration::{configuration_path, load_configuration, watch_token_settings};
use geopost::posts::PostsService;
use geopost::repository::PgRepository;
use geopost::startup::run;
use geopost::telemetry::init_telemetry;
use geopost::validators::EmailValidator;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // 구조화된 로깅 초기화
    init_telemetry();

    tracing::info!("Starting application");

    // 설정 로드
    let config_path = configuration_path();
    let configuration = match load_configuration(&config_path) {
        Ok(config) => {
            tracing::info!(path = %config_path.display(), "Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    // 데이터베이스 연결 풀 생성
    let db = &configuration.database;
    tracing::info!(
        host = %db.host,
        max_connections = db.max_connections,
        "Attempting to connect to database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .max_lifetime(db.max_lifetime())
        .acquire_timeout(db.acquire_timeout())
        .connect_with(db.connect_options())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    let repository = Arc::new(PgRepository::new(pool));
    repository.migrate().await.map_err(|e| {
        tracing::error!("Failed to run database migrations: {:?}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
    })?;
    tracing::info!("Database ready");

    // 토큰 설정은 재시작 없이 교체 가능
    let token_config = TokenConfigHandle::new(configuration.jwt.token_settings());
    let email_validator = EmailValidator::new(
        configuration.email.check_domain,
        Duration::from_millis(configuration.email.dns_timeout_ms),
    );
    let auth = Arc::new(AuthService::new(
        repository.clone(),
        TokenEngine::new(token_config.clone()),
        CredentialHasher::default(),
        email_validator,
        configuration.jwt.secret.clone(),
    ));
    let posts = Arc::new(PostsService::new(repository.clone()));

    let watcher = tokio::spawn(watch_token_settings(
        config_path,
        token_config,
        Duration::from_secs(configuration.application.config_reload_interval_secs.max(1)),
    ));

    // 서버 주소 설정
    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    // 서버 실행 (SIGINT/SIGTERM 시 graceful shutdown)
    let server = run(listener, auth, posts)?;
    let result = server.await;

    watcher.abort();
    repository.close().await;
    tracing::info!("Server stopped");

    result
}
