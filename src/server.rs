use crate::config::AppConfig;
use crate::processing::{derive_bar, derive_map};
use crate::render::{index_page, Rgb};
use crate::types::{Dataset, Selection};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::{Html, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Everything a request needs, built once at startup and never mutated.
pub struct AppState {
    pub dataset: Dataset,
    pub palette: Vec<Rgb>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, dataset: Dataset) -> Result<Self> {
        let palette = config.map.palette()?;
        Ok(Self {
            dataset,
            palette,
            config,
        })
    }
}

#[derive(Deserialize, Default)]
pub struct SelectionParams {
    country: Option<String>,
}

impl SelectionParams {
    fn selection(&self) -> Selection {
        Selection::from_param(self.country.as_deref())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/", get(index_handler))
        .route("/api/countries", get(countries_handler))
        .route("/api/map", get(map_handler))
        .route("/api/bar", get(bar_handler));

    if let Some(dir) = &state.config.server.static_dir {
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, dataset: Dataset) -> Result<()> {
    let addr = SocketAddr::from((config.server.host, config.server.port));
    let state = Arc::new(AppState::new(config, dataset)?);
    let app = router(state);

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(index_page(
        &state.config.server.title,
        &state.dataset.countries(),
    ))
}

async fn countries_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(
        state
            .dataset
            .countries()
            .into_iter()
            .map(str::to_string)
            .collect(),
    )
}

async fn map_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SelectionParams>,
) -> Json<Value> {
    let selection = params.selection();
    let figure = derive_map(&state.dataset, &selection, &state.config.map, &state.palette);
    debug!("Map for {:?}: {} markers", selection, figure.markers.len());
    Json(figure.to_plotly())
}

async fn bar_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SelectionParams>,
) -> Json<Value> {
    let selection = params.selection();
    let figure = derive_bar(&state.dataset, &selection, &state.config.bar);
    debug!("Bar for {:?}: {} cities", selection, figure.bars.len());
    Json(figure.to_plotly())
}
