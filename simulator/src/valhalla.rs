//! Client for the external Valhalla travel-time service: isochrone coverage
//! for shelter drafts and (for visualization only) point-to-point routes.
//! Any failure maps to a provider error the engine degrades on; nothing
//! here propagates a panic. The 10-second timeout lives on this client.

use std::time::Duration;

use evaccore::geojson::FeatureCollection;
use evaccore::prelude::Coordinates;
use serde::{Deserialize, Serialize};
use serde_json::json;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_MINUTES: f64 = 240.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Costing {
    #[default]
    Auto,
    Bicycle,
    Pedestrian,
    Bus,
    Truck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsochroneRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub minutes: f64,
    pub costing: Option<Costing>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub origin: LatLon,
    pub destination: LatLon,
    pub costing: Option<Costing>,
}

/// Decoded route leg chain plus the trip summary.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub distance_km: f64,
    pub duration_seconds: f64,
    pub coordinates: Vec<Coordinates>,
}

/// The provider failure shape: a human-readable message plus the HTTP
/// status when one was received.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderError {
    pub error: String,
    pub status: Option<u16>,
}

impl ProviderError {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: None,
        }
    }
}

pub type IsochroneResult = Result<FeatureCollection, ProviderError>;
pub type RouteResult = Result<RouteSummary, ProviderError>;

pub fn validate_isochrone_request(request: &IsochroneRequest) -> Option<ProviderError> {
    if !request.latitude.is_finite() || request.latitude.abs() > 90.0 {
        return Some(ProviderError::message("Invalid latitude"));
    }
    if !request.longitude.is_finite() || request.longitude.abs() > 180.0 {
        return Some(ProviderError::message("Invalid longitude"));
    }
    if !request.minutes.is_finite() || request.minutes <= 0.0 || request.minutes > MAX_MINUTES {
        return Some(ProviderError::message("Invalid minutes range"));
    }
    None
}

fn validate_position(position: &LatLon, label: &str) -> Option<ProviderError> {
    if !position.lat.is_finite()
        || position.lat.abs() > 90.0
        || !position.lon.is_finite()
        || position.lon.abs() > 180.0
    {
        return Some(ProviderError::message(format!("Invalid {label} coordinates")));
    }
    None
}

pub struct ValhallaClient {
    base_url: String,
    client: reqwest::Client,
}

impl ValhallaClient {
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Fetches the polygon reachable within the request's travel budget.
    pub async fn isochrone(&self, request: &IsochroneRequest) -> IsochroneResult {
        if let Some(error) = validate_isochrone_request(request) {
            return Err(error);
        }

        let body = json!({
            "contours": [{ "time": request.minutes }],
            "costing": request.costing.unwrap_or_default(),
            "locations": [{ "lat": request.latitude, "lon": request.longitude }],
            "polygons": true,
        });

        let response = self
            .client
            .post(format!("{}/isochrone", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|error| ProviderError::message(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError {
                error: format!("isochrone request failed: {text}"),
                status: Some(status.as_u16()),
            });
        }

        response
            .json::<FeatureCollection>()
            .await
            .map_err(|error| ProviderError::message(error.to_string()))
    }

    /// Fetches a driving route between two points, decoding the
    /// polyline6-encoded leg shapes into `[longitude, latitude]` pairs.
    pub async fn route(&self, request: &RouteRequest) -> RouteResult {
        if let Some(error) = validate_position(&request.origin, "origin") {
            return Err(error);
        }
        if let Some(error) = validate_position(&request.destination, "destination") {
            return Err(error);
        }

        let body = json!({
            "costing": request.costing.unwrap_or_default(),
            "locations": [
                { "lat": request.origin.lat, "lon": request.origin.lon },
                { "lat": request.destination.lat, "lon": request.destination.lon },
            ],
        });

        let response = self
            .client
            .post(format!("{}/route", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|error| ProviderError::message(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError {
                error: format!("route request failed: {text}"),
                status: Some(status.as_u16()),
            });
        }

        let trip: RouteResponse = response
            .json()
            .await
            .map_err(|error| ProviderError::message(error.to_string()))?;

        let coordinates = trip
            .trip
            .legs
            .iter()
            .flat_map(|leg| decode_polyline6(&leg.shape))
            .collect();
        Ok(RouteSummary {
            distance_km: trip.trip.summary.length,
            duration_seconds: trip.trip.summary.time,
            coordinates,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    trip: Trip,
}

#[derive(Debug, Deserialize)]
struct Trip {
    legs: Vec<TripLeg>,
    summary: TripSummary,
}

#[derive(Debug, Deserialize)]
struct TripLeg {
    shape: String,
}

#[derive(Debug, Deserialize)]
struct TripSummary {
    length: f64,
    time: f64,
}

/// Decodes a precision-6 encoded polyline into `[longitude, latitude]`
/// pairs. Truncated input yields the points decoded so far.
pub fn decode_polyline6(encoded: &str) -> Vec<Coordinates> {
    const FACTOR: f64 = 1_000_000.0;
    let bytes = encoded.as_bytes();
    let mut coordinates = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while index < bytes.len() {
        let Some((delta_lat, next)) = decode_varint(bytes, index) else {
            break;
        };
        let Some((delta_lon, next)) = decode_varint(bytes, next) else {
            break;
        };
        index = next;
        lat += delta_lat;
        lon += delta_lon;
        coordinates.push([lon as f64 / FACTOR, lat as f64 / FACTOR]);
    }
    coordinates
}

fn decode_varint(bytes: &[u8], mut index: usize) -> Option<(i64, usize)> {
    let mut shift = 0;
    let mut result: i64 = 0;
    loop {
        let byte = i64::from(*bytes.get(index)?) - 63;
        index += 1;
        result |= (byte & 0x1f) << shift;
        shift += 5;
        if byte < 0x20 {
            break;
        }
    }
    let delta = if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    };
    Some((delta, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isochrone_validation_rejects_out_of_range_input() {
        let valid = IsochroneRequest {
            latitude: 13.0,
            longitude: 121.0,
            minutes: 10.0,
            costing: None,
        };
        assert!(validate_isochrone_request(&valid).is_none());

        let bad_lat = IsochroneRequest { latitude: 91.0, ..valid.clone() };
        assert_eq!(
            validate_isochrone_request(&bad_lat).unwrap().error,
            "Invalid latitude"
        );

        let bad_lon = IsochroneRequest { longitude: -181.0, ..valid.clone() };
        assert_eq!(
            validate_isochrone_request(&bad_lon).unwrap().error,
            "Invalid longitude"
        );

        for minutes in [0.0, -5.0, 241.0, f64::NAN] {
            let bad_minutes = IsochroneRequest { minutes, ..valid.clone() };
            assert_eq!(
                validate_isochrone_request(&bad_minutes).unwrap().error,
                "Invalid minutes range"
            );
        }
    }

    #[test]
    fn polyline6_decodes_single_point() {
        // lat delta +1e-6 encodes to 'A', lon delta -1e-6 to '@'.
        let points = decode_polyline6("A@");
        assert_eq!(points.len(), 1);
        assert!((points[0][0] + 0.000001).abs() < 1e-12);
        assert!((points[0][1] - 0.000001).abs() < 1e-12);
    }

    #[test]
    fn polyline6_accumulates_deltas() {
        // Second pair of zero deltas repeats the first point.
        let points = decode_polyline6("A@??");
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], points[1]);
    }

    #[test]
    fn polyline6_handles_empty_and_truncated_input() {
        assert!(decode_polyline6("").is_empty());
        // A lone latitude chunk with no matching longitude is dropped.
        assert!(decode_polyline6("A").is_empty());
    }
}
