use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use forum_app::domain::VoteResult;
use forum_app::{AppConfig, AppContext};
use forum_errors::AppError;
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Set by the authenticating proxy in front of this service.
const VOTER_HEADER: &str = "x-voter-id";

#[derive(Deserialize)]
struct CastVoteBody {
    value: i64,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration");
    let app_context = AppContext::connect(&config)
        .await
        .expect("Failed to connect to database");

    let app = router(app_context);

    tracing::info!("Listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}

fn router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/posts/{post_id}/vote", get(get_tally).post(cast_vote))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        .with_state(ctx)
}

async fn cast_vote(
    State(ctx): State<AppContext>,
    Path(post_id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<CastVoteBody>,
) -> Result<Json<VoteResult>, AppError> {
    let voter_id = voter_id(&headers)?.ok_or(AppError::Unauthenticated)?;

    let result = match ctx.votes.cast_vote(voter_id, post_id, body.value).await {
        // A conflict rolled the attempt back, so a retry re-reads the vote from
        // scratch. A timeout already spent the caller's budget and goes back as is.
        Err(e) if should_retry(&e) => {
            tracing::warn!(%voter_id, %post_id, error = %e, "Retrying vote once");
            ctx.votes.cast_vote(voter_id, post_id, body.value).await
        }
        other => other,
    }?;

    Ok(Json(result))
}

async fn get_tally(
    State(ctx): State<AppContext>,
    Path(post_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<VoteResult>, AppError> {
    let voter_id = voter_id(&headers)?;
    Ok(Json(ctx.votes.tally(voter_id, post_id).await?))
}

fn should_retry(err: &AppError) -> bool {
    matches!(err, AppError::ConcurrencyConflict(_))
}

/// A missing header means an anonymous caller; a malformed one is rejected.
fn voter_id(headers: &HeaderMap) -> Result<Option<Uuid>, AppError> {
    match headers.get(VOTER_HEADER) {
        None => Ok(None),
        Some(raw) => raw
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(Some)
            .ok_or(AppError::Unauthenticated),
    }
}
