use axum::{
    extract::{Json, State},
    http::header::{ACCEPT_LANGUAGE, AUTHORIZATION},
    http::HeaderMap,
    routing::post,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::models::{AnalyzeRequest, ApiResult, Mode, Request};
use crate::error::{AppError, Result};
use crate::{auth, extract, normalize, prompt, quota, upstream, AppState};

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze_handler))
        .layer(
            // Permissive CORS also answers the pre-flight OPTIONS request.
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn analyze_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(raw): Json<AnalyzeRequest>,
) -> Result<Json<ApiResult>> {
    let start = std::time::Instant::now();

    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Auth("missing Authorization header".to_string()))?;
    let token = auth::bearer_token(auth_header)?;
    let user_id = auth::resolve_user(&state.http, &state.config, token).await?;

    let accept_language = headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok());
    let request = Request::from_parts(raw, accept_language)?;

    let advanced = request.mode == Mode::Recommendation;
    if !quota::admit(&state.http, &state.config, &user_id, advanced).await {
        warn!(%user_id, class = quota::request_class(advanced), "request rejected by quota");
        return Err(AppError::Quota { advanced });
    }

    let result = process_request(&state, &request).await?;

    info!(
        mode = request.mode.as_str(),
        language = request.language.as_str(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );
    Ok(Json(result))
}

async fn process_request(state: &AppState, request: &Request) -> Result<ApiResult> {
    if let Some(cached) = state.cache.get(request) {
        info!("cache hit, skipping answer service");
        return Ok(cached);
    }

    let (system_prompt, user_message) = prompt::build_prompt(request);
    let raw_text =
        upstream::query_answer_service(&state.http, &state.config, &system_prompt, &user_message)
            .await?;

    let value = extract::extract_json(&raw_text)?;
    let cleaned = extract::clean_value(value);
    let result = normalize::normalize(cleaned)?;

    state.cache.put(request.clone(), result.clone());
    Ok(result)
}
