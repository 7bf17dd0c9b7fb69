use crate::{
    account::{AccessControlGate, AccountService},
    cli::globals::GlobalArgs,
    qrorganizer::handlers::{account, health, site, CookieSettings},
    storage::{self, PgAccessCodeStore, PgIdentityStore, PgSignInService, PgSubscriptionCatalog},
    subscription::SubscriptionCatalog,
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Method, Request},
    routing::{get, options, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        account::login,
        account::create,
        account::logout,
        site::site,
        health::health
    ),
    components(schemas(
        crate::account::AccountCredentials,
        crate::account::UserSession,
        crate::account::ports::IdentityError,
        crate::subscription::SubscriptionLevel,
        crate::subscription::SubscriptionFeature,
        handlers::types::ErrorResponse,
        handlers::types::IdentityResult,
        handlers::types::LoginRequest,
        handlers::types::SiteInfo,
        health::Health
    )),
    tags(
        (name = "account", description = "Registration and sessions"),
        (name = "site", description = "Public site configuration"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

/// Everything the API routes need, injected as extensions.
#[derive(Clone)]
pub struct AppContext {
    pub accounts: AccountService,
    pub catalog: Arc<dyn SubscriptionCatalog>,
    pub cookies: CookieSettings,
}

/// Build the `/api` and `GET /health` routes with request-id, tracing and CORS
/// layers.
///
/// `GET /health` reads the `PgPool` extension, which [`new`] layers on outside.
pub fn router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    Router::new()
        .route("/api/login", post(account::login))
        .route("/api/create", post(account::create))
        .route("/api/logout", post(account::logout))
        .route("/api/site", get(site::site))
        .route("/health", get(health::health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(ctx.accounts))
                .layer(Extension(ctx.catalog))
                .layer(Extension(ctx.cookies)),
        )
}

/// Connect to Postgres, wire the stores, and serve until Ctrl-C.
///
/// # Errors
/// Returns an error if the database is unreachable or the port cannot be bound.
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    let pool = storage::connect(&dsn).await?;

    let gate = AccessControlGate::new(
        globals.restricted_environment,
        Arc::new(PgAccessCodeStore::new(pool.clone())),
    );
    let accounts = AccountService::new(
        Arc::new(PgIdentityStore::with_policy(
            pool.clone(),
            globals.password_policy.clone(),
        )),
        Arc::new(PgSignInService::new(
            pool.clone(),
            globals.session_ttl_seconds,
            globals.require_confirmed_email,
        )),
        gate,
    );

    let ctx = AppContext {
        accounts,
        catalog: Arc::new(PgSubscriptionCatalog::new(pool.clone())),
        cookies: CookieSettings {
            ttl_seconds: globals.session_ttl_seconds,
            secure: globals.secure_cookies,
        },
    };

    let app = router(ctx)
        .route("/health", options(health::health))
        .layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!(
        restricted = globals.restricted_environment,
        "Listening on [::]:{}", port
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let method = request.method();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    info_span!("http-request", %method, route, request_id)
}
