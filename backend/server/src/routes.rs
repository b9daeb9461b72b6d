use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
};
use serde::Deserialize;
use webring::{Options, Style, Theme};

use crate::{
    error::AppError,
    models::{Deleted, PublicEntry, SubmitPayload},
    state::AppState,
    utils::{ClientAddress, bearer, geo_hint, referer_host},
};

#[derive(Deserialize)]
pub struct DeleteParams {
    id: Option<String>,
}

#[derive(Deserialize)]
pub struct WebringParams {
    host: Option<String>,
    theme: Option<String>,
    style: Option<String>,
    current_site: Option<String>,
}

pub async fn list_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PublicEntry>>, AppError> {
    Ok(Json(state.guestbook.list().await?))
}

pub async fn submit_handler(
    State(state): State<Arc<AppState>>,
    ClientAddress(address): ClientAddress,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: SubmitPayload =
        serde_json::from_slice(&body).map_err(|_| AppError::MalformedPayload)?;
    let geo = geo_hint(&headers, &state.config);

    let entry = state
        .guestbook
        .submit(payload, &address, geo.as_ref())
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DeleteParams>,
    headers: HeaderMap,
) -> Result<Json<Deleted>, AppError> {
    state
        .guestbook
        .delete(params.id.as_deref(), bearer(&headers))
        .await?;

    Ok(Json(Deleted::default()))
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

pub async fn webring_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WebringParams>,
    headers: HeaderMap,
) -> Html<String> {
    let options = Options {
        theme: params.theme.as_deref().map(Theme::from_name).unwrap_or_default(),
        style: params.style.as_deref().map(Style::from_name).unwrap_or_default(),
    };
    let host = params.host.or_else(|| referer_host(&headers)).unwrap_or_default();

    Html(
        state
            .webring
            .render_for(&host, params.current_site.as_deref(), options)
            .await,
    )
}
