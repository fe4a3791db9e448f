//! HTTP bridge consumed by the external map front-end: snapshots and
//! progress collections out, commands in. A one-second interval ticks
//! whichever runs hold a live timer while the bridge is up.

use crate::gui_bridge::model::StatusView;
use crate::valhalla::{IsochroneRequest, RouteRequest, ValhallaClient};
use evaccore::engine::{Command, SimulationEngine};
use evaccore::prelude::Phase;
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
    time::Duration,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

fn bridge_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9400))
}

const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Bridge that hosts the scenario HTTP endpoints and owns the production
/// tick scheduler.
pub struct GuiBridge {
    engine: Arc<RwLock<SimulationEngine>>,
}

impl GuiBridge {
    pub fn new(engine: Arc<RwLock<SimulationEngine>>, valhalla: ValhallaClient) -> Self {
        let engine_for_filter = engine.clone();
        let engine_filter = warp::any().map(move || engine_for_filter.clone());
        let valhalla = Arc::new(valhalla);
        let valhalla_filter = warp::any().map(move || valhalla.clone());

        let state_route = warp::path("state")
            .and(warp::get())
            .and(engine_filter.clone())
            .map(|engine: Arc<RwLock<SimulationEngine>>| {
                warp::reply::json(&engine.read().unwrap().snapshot())
            });

        let status_route = warp::path("status")
            .and(warp::get())
            .and(engine_filter.clone())
            .map(|engine: Arc<RwLock<SimulationEngine>>| {
                let snapshot = engine.read().unwrap().snapshot();
                warp::reply::json(&StatusView::from_snapshot(&snapshot))
            });

        let regional_route = warp::path!("progress" / "regional")
            .and(warp::get())
            .and(engine_filter.clone())
            .map(|engine: Arc<RwLock<SimulationEngine>>| {
                warp::reply::json(&engine.read().unwrap().evacuation_run().regional_progress)
            });

        let return_route = warp::path!("progress" / "return")
            .and(warp::get())
            .and(engine_filter.clone())
            .map(|engine: Arc<RwLock<SimulationEngine>>| {
                warp::reply::json(&engine.read().unwrap().return_home_run().return_progress)
            });

        let hazards_route = warp::path("hazards")
            .and(warp::get())
            .and(engine_filter.clone())
            .map(|engine: Arc<RwLock<SimulationEngine>>| {
                let guard = engine.read().unwrap();
                let run = guard.typhoon_run();
                warp::reply::json(&json!({
                    "floodedArea": &run.flooded_area,
                    "debris": &run.debris,
                    "safetyLevel": run.safety_level,
                    "totalHazards": run.total_hazards,
                }))
            });

        let command_route = warp::path("command")
            .and(warp::post())
            .and(warp::body::json())
            .and(engine_filter.clone())
            .map(
                |command: Command, engine: Arc<RwLock<SimulationEngine>>| {
                    match engine.write().unwrap().apply(command) {
                        Ok(snapshot) => warp::reply::with_status(
                            warp::reply::json(&snapshot),
                            StatusCode::OK,
                        ),
                        Err(err) => {
                            eprintln!("command error: {err}");
                            warp::reply::with_status(
                                warp::reply::json(&json!({"error": err.to_string()})),
                                StatusCode::BAD_REQUEST,
                            )
                        }
                    }
                },
            );

        // Return-route polylines for the map overlay; purely a proxy, the
        // phase machines never consult it.
        let route_plan_route = warp::path("route")
            .and(warp::post())
            .and(warp::body::json())
            .and(valhalla_filter.clone())
            .and_then(
                |request: RouteRequest, valhalla: Arc<ValhallaClient>| async move {
                    match valhalla.route(&request).await {
                        Ok(summary) => Ok::<_, warp::Rejection>(warp::reply::with_status(
                            warp::reply::json(&summary),
                            StatusCode::OK,
                        )),
                        Err(failure) => Ok(warp::reply::with_status(
                            warp::reply::json(&json!({
                                "error": failure.error,
                                "status": failure.status,
                            })),
                            StatusCode::BAD_GATEWAY,
                        )),
                    }
                },
            );

        // Reads the placed draft, asks the provider for its isochrone, and
        // attaches the result. The generation captured before the fetch
        // keeps a superseded draft from receiving a stale polygon.
        let fetch_coverage_route = warp::path!("draft" / "fetch-coverage")
            .and(warp::post())
            .and(engine_filter)
            .and(valhalla_filter)
            .and_then(
                |engine: Arc<RwLock<SimulationEngine>>, valhalla: Arc<ValhallaClient>| async move {
                    let pending = {
                        let guard = engine.read().unwrap();
                        guard.draft().and_then(|draft| {
                            draft.coordinates.map(|coordinates| {
                                (
                                    draft.coverage_request,
                                    IsochroneRequest {
                                        latitude: coordinates[1],
                                        longitude: coordinates[0],
                                        minutes: draft.radius_minutes,
                                        costing: None,
                                    },
                                )
                            })
                        })
                    };

                    let Some((generation, request)) = pending else {
                        return Ok::<_, warp::Rejection>(warp::reply::with_status(
                            warp::reply::json(&json!({"error": "no placed draft to fetch coverage for"})),
                            StatusCode::BAD_REQUEST,
                        ));
                    };

                    let outcome = valhalla
                        .isochrone(&request)
                        .await
                        .map_err(|failure| failure.error);
                    let applied = engine
                        .write()
                        .unwrap()
                        .attach_draft_coverage(generation, outcome);
                    Ok(warp::reply::with_status(
                        warp::reply::json(&json!({"applied": applied})),
                        StatusCode::OK,
                    ))
                },
            );

        let engine_for_ticker = engine.clone();
        thread::spawn(move || {
            let routes = state_route
                .or(status_route)
                .or(regional_route)
                .or(return_route)
                .or(hazards_route)
                .or(command_route)
                .or(route_plan_route)
                .or(fetch_coverage_route);
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build runtime");
            runtime.block_on(async move {
                let ticker = async {
                    let mut interval = tokio::time::interval(TICK_INTERVAL);
                    loop {
                        interval.tick().await;
                        let mut guard = engine_for_ticker.write().unwrap();
                        guard.tick(Phase::Evacuation);
                        guard.tick(Phase::Typhoon);
                        guard.tick(Phase::ReturnHome);
                    }
                };
                tokio::join!(warp::serve(routes).run(bridge_bind_address()), ticker);
            });
        });

        Self { engine }
    }

    pub fn publish_status(&self, message: &str) {
        println!("[bridge] {message}");
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> evaccore::engine::EngineSnapshot {
        self.engine.read().unwrap().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evaccore::engine::SimulationMode;

    #[test]
    fn bridge_shares_the_engine_with_its_caller() {
        let engine = Arc::new(RwLock::new(SimulationEngine::with_seed(2)));
        let client = ValhallaClient::new("http://127.0.0.1:8002").unwrap();
        let bridge = GuiBridge::new(engine.clone(), client);

        engine
            .write()
            .unwrap()
            .apply(Command::StartAddShelter)
            .unwrap();
        let snapshot = bridge.snapshot();
        assert_eq!(snapshot.mode, SimulationMode::AddShelters);
        assert!(snapshot.draft.is_some());
    }
}
