use crate::config::AppConfig;
use crate::interaction::{Controller, InteractionEvent, RenderCommand};
use crate::render::page::render_page;
use crate::types::{CountyRecord, GeoFeature};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use geo::{BoundingRect, Contains, Point};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info};

// Wrapper for RTree indexing
pub struct CountyIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CountyIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub features: Vec<GeoFeature>,
    pub tree: RTree<CountyIndex>,
    pub controller: Mutex<Controller>,
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct CountyResponse {
    geoid: String,
    record: Option<CountyRecord>,
}

type ApiError = (StatusCode, String);

impl AppState {
    pub fn new(features: Vec<GeoFeature>, controller: Controller) -> Self {
        let tree_items: Vec<CountyIndex> = features
            .iter()
            .enumerate()
            .filter_map(|(i, f)| {
                let rect = f.geometry.bounding_rect()?;
                Some(CountyIndex {
                    index: i,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        AppState {
            features,
            tree: RTree::bulk_load(tree_items),
            controller: Mutex::new(controller),
        }
    }

    fn controller(&self) -> Result<MutexGuard<'_, Controller>, ApiError> {
        self.controller.lock().map_err(|e| {
            error!("Controller lock poisoned: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "controller unavailable".to_string())
        })
    }
}

pub fn router(state: Arc<AppState>, output_dir: &std::path::Path) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/api/event", post(event_handler))
        .route("/api/counties", get(counties_handler))
        .route("/api/county", get(county_handler))
        .nest_service("/output", ServeDir::new(output_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, state: AppState) -> Result<()> {
    let state = Arc::new(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    let app = router(state, &config.output.dir);

    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn page_handler(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    let controller = state.controller()?;
    let map_svg = controller.map().to_svg(controller.view());
    let chart_svg = controller.chart().to_svg(controller.records(), controller.view());
    Ok(Html(render_page(&map_svg, &chart_svg, controller.view(), true)))
}

async fn event_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<InteractionEvent>,
) -> Result<Json<Vec<RenderCommand>>, ApiError> {
    let mut controller = state.controller()?;
    Ok(Json(controller.handle(event)))
}

async fn counties_handler(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    let features = state
        .features
        .iter()
        .map(|f| {
            let mut properties = JsonObject::new();
            properties.insert("GEOID".to_string(), f.geoid.clone().into());
            if let Some(name) = &f.name {
                properties.insert("NAME".to_string(), name.clone().into());
            }
            for (attr, value) in f.attributes.iter().flatten() {
                // NaN has no JSON form; it serializes as null.
                properties.insert(attr.to_string(), serde_json::json!(value));
            }
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&f.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    Json(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

async fn county_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Option<CountyResponse>>, ApiError> {
    let point = Point::new(params.lon, params.lat);
    let envelope = AABB::from_point([params.lon, params.lat]);

    let hit = state
        .tree
        .locate_in_envelope_intersecting(&envelope)
        .filter_map(|candidate| state.features.get(candidate.index))
        .find(|f| f.geometry.contains(&point));

    let Some(feature) = hit else {
        return Ok(Json(None));
    };
    let controller = state.controller()?;
    let record = controller
        .records()
        .iter()
        .find(|r| r.geoid == feature.geoid)
        .cloned();

    Ok(Json(Some(CountyResponse {
        geoid: feature.geoid.clone(),
        record,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChartConfig, MapConfig};
    use crate::data::tests::{CSV, TOPOLOGY};
    use crate::data::{parse_features, parse_records};
    use crate::join::join_attributes;
    use crate::render::chart::ChartLayout;
    use crate::render::map::MapSurface;
    use crate::types::AttributeName;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn app() -> Router {
        let records = parse_records(CSV, "GEOID").unwrap();
        let mut counties = parse_features(TOPOLOGY, "NJ_Counties", "GEOID").unwrap();
        join_attributes(&records, &mut counties);
        let map = MapSurface::build(&MapConfig::default(), &counties, &[]);
        let controller = Controller::new(
            records,
            map,
            ChartLayout::new(&ChartConfig::default()),
            HashMap::new(),
            AttributeName::Placeholder,
        );
        let state = Arc::new(AppState::new(counties, controller));
        router(state, std::path::Path::new("output"))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn page_is_served() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains(r#"class="dropdown""#));
        assert!(html.contains("<script>"));
    }

    #[tokio::test]
    async fn events_return_commands() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/event")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"pointer_enter","geoid":"34001"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let commands = body_json(response).await;
        let ops: Vec<_> = commands
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["op"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ops, vec!["set_stroke", "set_stroke", "show_label"]);
    }

    #[tokio::test]
    async fn point_lookup_finds_containing_county() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/county?lat=40.0&lon=-75.0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["geoid"], "34001");
        assert_eq!(json["record"]["name"], "Atlantic");

        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/county?lat=10.0&lon=10.0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(body_json(response).await.is_null());
    }

    #[tokio::test]
    async fn counties_are_served_as_geojson() {
        let response = app()
            .oneshot(Request::builder().uri("/api/counties").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["features"][0]["properties"]["Age 0-9"], 118.0);
        assert!(json["features"][1]["properties"].get("Age 0-9").is_none());
    }
}
