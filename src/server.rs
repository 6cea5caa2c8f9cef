use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use crate::core::{
    alerts::{hub::AlertHub, wire},
    config::Settings,
    coordinator::Coordinator,
    error::{Error, Result},
    model::{Coordinate, DisasterReport, MarkerStyle},
    nearby::{AppliedQuery, NearbyQuerySession},
    proximity::ProximityIndex,
};

/// Zoom used by the overview map, which shows every report at once
const OVERVIEW_ZOOM: f64 = 4.0;

#[derive(Clone)]
pub struct AppState {
    pub hub: AlertHub,
    pub index: Arc<ProximityIndex>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            hub: AlertHub::new(),
            index: Arc::new(ProximityIndex::new()),
            settings: Arc::new(settings),
        }
    }
}

pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidRadius(_) => StatusCode::BAD_REQUEST,
            Error::UnknownReport(_) => StatusCode::NOT_FOUND,
            Error::Io(_) | Error::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NearbyParams {
    pub radius_km: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OverviewMarker {
    pub report: DisasterReport,
    pub marker: MarkerStyle,
}

#[derive(Debug, Serialize)]
pub struct Overview {
    pub center: Option<Coordinate>,
    pub zoom: f64,
    pub markers: Vec<OverviewMarker>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/nearby/{id}", get(nearby_handler))
        .route("/overview", get(overview_handler))
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub, params.client_id))
}

/// Forward alert events to one WebSocket until either side goes away.
async fn handle_socket(socket: WebSocket, hub: AlertHub, client_id: Option<String>) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = hub.connect(client_id);

    loop {
        tokio::select! {
            event = session.recv() => {
                let Some(event) = event else { break };
                match wire::encode(&event) {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => log::warn!("Failed to encode alert for {}: {}", event.payload.id, e),
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Clients only listen; pings are answered by axum
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    session.close();
}

pub async fn nearby_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<NearbyParams>,
) -> std::result::Result<Json<AppliedQuery>, ApiError> {
    let mut session = NearbyQuerySession::for_report(state.index.clone(), &id)?;
    let radius_km = params.radius_km.unwrap_or(state.settings.default_radius_km);
    session.set_radius_km(radius_km)?;
    Ok(Json(session.apply().clone()))
}

pub async fn overview_handler(State(state): State<AppState>) -> Json<Overview> {
    let markers = state
        .index
        .snapshot()
        .into_iter()
        .map(|report| OverviewMarker {
            marker: report.marker_style(),
            report,
        })
        .collect();
    Json(Overview {
        center: state.index.overview_center(),
        zoom: OVERVIEW_ZOOM,
        markers,
    })
}

/// Follow the report feed in the background.
pub fn spawn_coordinator(state: &AppState) -> tokio::task::JoinHandle<()> {
    let mut coordinator = Coordinator::new(
        state.settings.feed_path.clone(),
        state.index.clone(),
        state.hub.clone(),
    );
    let interval = Duration::from_millis(state.settings.poll_interval_ms.max(1));

    tokio::spawn(async move {
        log::info!("Coordinator started");
        loop {
            let output = coordinator.tick();
            for msg in output.logs {
                log::info!("{}", msg);
            }
            tokio::time::sleep(interval).await;
        }
    })
}

pub async fn run(settings: Settings) -> Result<()> {
    let state = AppState::new(settings);
    let _coordinator = spawn_coordinator(&state);

    let addr = state.settings.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alerts::model::AlertEvent;
    use crate::core::geo;
    use crate::core::model::make_report;

    async fn wait_until(mut ready: impl FnMut() -> bool) {
        for _ in 0..500 {
            if ready() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    fn state_with_reports() -> AppState {
        let state = AppState::new(Settings::default());
        state.index.upsert(make_report("focus", 0.0, 0.0));
        let lng_20km = (20_000.0 / geo::EARTH_RADIUS_METERS).to_degrees();
        let mut far = make_report("far", 0.0, lng_20km);
        far.tags = vec!["Urgent".to_string()];
        state.index.upsert(far);
        state
    }

    #[tokio::test]
    async fn test_nearby_uses_default_radius() {
        let state = state_with_reports();
        let Json(applied) = nearby_handler(
            State(state),
            Path("focus".to_string()),
            Query(NearbyParams::default()),
        )
        .await
        .unwrap_or_else(|_| panic!("nearby failed"));
        assert_eq!(applied.radius_meters, 10_000.0);
        assert_eq!(applied.matches.len(), 1);
        assert_eq!(applied.zoom, geo::zoom_level(10_000.0));
    }

    #[tokio::test]
    async fn test_nearby_errors_map_to_status() {
        let state = state_with_reports();
        let missing = nearby_handler(
            State(state.clone()),
            Path("nope".to_string()),
            Query(NearbyParams::default()),
        )
        .await;
        match missing {
            Err(e) => assert_eq!(e.into_response().status(), StatusCode::NOT_FOUND),
            Ok(_) => panic!("expected not found"),
        }

        let bad_radius = nearby_handler(
            State(state),
            Path("focus".to_string()),
            Query(NearbyParams { radius_km: Some(0.0) }),
        )
        .await;
        match bad_radius {
            Err(e) => assert_eq!(e.into_response().status(), StatusCode::BAD_REQUEST),
            Ok(_) => panic!("expected bad request"),
        }
    }

    #[tokio::test]
    async fn test_overview_marks_urgent_reports() {
        let state = state_with_reports();
        let Json(overview) = overview_handler(State(state)).await;
        assert_eq!(overview.zoom, OVERVIEW_ZOOM);
        assert!(overview.center.is_some());
        assert_eq!(overview.markers.len(), 2);
        for m in &overview.markers {
            let expected = if m.report.id == "far" { MarkerStyle::Urgent } else { MarkerStyle::Default };
            assert_eq!(m.marker, expected);
        }
    }

    #[tokio::test]
    async fn test_ws_streams_alerts_and_closes_session() {
        let state = AppState::new(Settings::default());
        let hub = state.hub.clone();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });

        let url = format!("ws://{}/ws?client_id=userB", addr);
        let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        wait_until(|| hub.connected() == 1).await;
        assert_eq!(hub.connected_clients(), vec!["userB".to_string()]);

        let mut report = make_report("ws-1", 0.0, 0.0);
        report.tags = vec!["urgent".to_string()];
        assert_eq!(hub.publish(&AlertEvent::new_report(report)), 1);

        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = frame.into_text().unwrap();
        let event = wire::decode(&text).unwrap();
        assert_eq!(event.payload.id, "ws-1");
        assert!(event.payload.has_urgent_tag());

        socket.close(None).await.unwrap();
        wait_until(|| hub.connected() == 0).await;
    }
}
