use axum::http::{HeaderName, HeaderValue, Method, Request, Response, header};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::{net::SocketAddr, sync::Arc, time::Duration};

use petcare_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    error,
    middleware::auth::JwtAuthorizer,
    notify::{HttpSender, Notifier, RetryPolicy},
    payment::RazorpayClient,
    routes::app_router,
    state::{AppState, Settings},
    store::{DocumentStore, MemoryStore, PgDocumentStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,petcare_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    error::expose_details(!config.production);

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let conn = create_orm_conn(url, config.upstream_timeout).await?;
            run_migrations(&conn).await?;
            tracing::info!("using postgres document store");
            Arc::new(PgDocumentStore::new(conn, config.upstream_timeout))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let sender = Arc::new(HttpSender::new(&config.notify, config.upstream_timeout)?);
    let (notifier, _outbox) = Notifier::start(
        sender,
        RetryPolicy::from(&config.notify),
        config.notify.queue_capacity,
    );
    let gateway = Arc::new(RazorpayClient::new(
        config.razorpay_api_url.clone(),
        config.razorpay_key_id.clone(),
        config.razorpay_key_secret.clone(),
        config.upstream_timeout,
    )?);

    let state = AppState {
        store,
        notifier,
        gateway,
        authorizer: Arc::new(JwtAuthorizer::new(&config.jwt_secret)),
        settings: Arc::new(Settings {
            consistency: config.consistency,
            razorpay_key_id: config.razorpay_key_id.clone(),
            razorpay_key_secret: config.razorpay_key_secret.clone(),
        }),
    };
    tracing::info!(consistency = ?config.consistency, "state ready");

    let concurrency_limit_layer = ConcurrencyLimitLayer::new(100);

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_url.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        })
        .on_request(|request: &Request<_>, _span: &tracing::Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "request started"
            );
        })
        .on_response(|response: &Response<_>, latency: Duration, _span: &tracing::Span| {
            tracing::info!(
                status = %response.status(),
                ms = %latency.as_millis(),
                "request finished"
            );
        });

    let app = app_router(state)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(cors)
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::new(
            request_id_header.clone(),
        ))
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid,
        ))
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(concurrency_limit_layer);

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    tracing::info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
