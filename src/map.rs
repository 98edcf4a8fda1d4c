//! Fleet map rendering.
//!
//! Produces a self-contained HTML document that loads the Google Maps
//! JavaScript API and draws one marker per vehicle. The document is meant
//! to be written to a file or injected into a web view.

use crate::models::{Device, LocationPoint};
use chrono::{DateTime, Utc};
use indoc::indoc;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

const MOVING_COLOR: &str = "#27ae60";
const STOPPED_COLOR: &str = "#e74c3c";
const DEFAULT_ZOOM: u8 = 12;

/// A vehicle position as shown on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "speed_text")]
    pub speed: String,
    #[serde(default)]
    pub location: Option<String>,
}

fn speed_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => format!("{} km/h", n),
        _ => String::new(),
    })
}

impl Vehicle {
    /// `moving` or `En movimiento`, ignoring case
    pub fn is_moving(&self) -> bool {
        let status = self.status.trim().to_lowercase();
        status == "moving" || status == "en movimiento"
    }

    fn has_position(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// What the page script needs per marker
#[derive(Serialize)]
struct Marker<'a> {
    id: i64,
    name: &'a str,
    lat: f64,
    lng: f64,
    status: &'a str,
    speed: &'a str,
    location: Option<&'a str>,
    label: String,
    color: &'static str,
    moving: bool,
}

impl<'a> From<&'a Vehicle> for Marker<'a> {
    fn from(vehicle: &'a Vehicle) -> Self {
        let moving = vehicle.is_moving();
        Self {
            id: vehicle.id,
            name: &vehicle.name,
            lat: vehicle.latitude,
            lng: vehicle.longitude,
            status: &vehicle.status,
            speed: &vehicle.speed,
            location: vehicle.location.as_deref(),
            label: vehicle.name.chars().next().map(String::from).unwrap_or_default(),
            color: if moving { MOVING_COLOR } else { STOPPED_COLOR },
            moving,
        }
    }
}

const TEMPLATE: &str = indoc! {r#"
    <!DOCTYPE html>
    <html>
      <head>
        <meta charset="utf-8">
        <meta name="viewport" content="width=device-width, initial-scale=1.0">
        <title>TrackGPX fleet map</title>
        <style>
          * { margin: 0; padding: 0; box-sizing: border-box; }
          html, body { height: 100%; width: 100%; overflow: hidden; }
          #map { height: 100%; width: 100%; }
          .info-window { font-family: Arial, sans-serif; padding: 8px; }
          .info-window h3 { margin: 0 0 8px 0; color: #2c3e50; font-size: 14px; }
          .info-window p { margin: 4px 0; font-size: 12px; color: #555; }
          .info-window .status {
            display: inline-block;
            padding: 2px 8px;
            border-radius: 12px;
            font-size: 11px;
            font-weight: bold;
            margin-top: 4px;
            color: white;
          }
          .info-window .moving { background: __MOVING_COLOR__; }
          .info-window .stopped { background: __STOPPED_COLOR__; }
        </style>
      </head>
      <body>
        <div id="map"></div>
        <script>
          function escapeHtml(value) {
            return String(value == null ? '' : value)
              .replace(/&/g, '&amp;')
              .replace(/</g, '&lt;')
              .replace(/>/g, '&gt;')
              .replace(/"/g, '&quot;')
              .replace(/'/g, '&#39;');
          }

          function initMap() {
            const map = new google.maps.Map(document.getElementById('map'), {
              zoom: __ZOOM__,
              center: { lat: __CENTER_LAT__, lng: __CENTER_LNG__ },
              mapTypeId: 'roadmap',
              styles: [
                { featureType: 'poi', elementType: 'labels', stylers: [{ visibility: 'off' }] }
              ],
              streetViewControl: false,
              mapTypeControl: true,
              fullscreenControl: false,
            });

            const vehicles = __VEHICLES__;
            const markers = [];

            vehicles.forEach(function (vehicle) {
              const marker = new google.maps.Marker({
                position: { lat: vehicle.lat, lng: vehicle.lng },
                map: map,
                title: vehicle.name,
                icon: {
                  path: google.maps.SymbolPath.CIRCLE,
                  scale: 8,
                  fillColor: vehicle.color,
                  fillOpacity: 1,
                  strokeColor: '#ffffff',
                  strokeWeight: 2,
                },
                label: {
                  text: vehicle.label,
                  color: '#ffffff',
                  fontSize: '12px',
                  fontWeight: 'bold',
                },
              });

              const content =
                '<div class="info-window">' +
                '<h3>' + escapeHtml(vehicle.name) + '</h3>' +
                '<p><strong>Location:</strong> ' + escapeHtml(vehicle.location || 'Unknown') + '</p>' +
                '<p><strong>Speed:</strong> ' + escapeHtml(vehicle.speed) + '</p>' +
                '<span class="status ' + (vehicle.moving ? 'moving' : 'stopped') + '">' +
                escapeHtml(vehicle.status) + '</span>' +
                '</div>';

              const infoWindow = new google.maps.InfoWindow({ content: content });
              marker.addListener('click', function () {
                markers.forEach(function (m) { m.infoWindow.close(); });
                infoWindow.open(map, marker);
              });
              markers.push({ marker: marker, infoWindow: infoWindow });
            });

            if (vehicles.length > 1) {
              const bounds = new google.maps.LatLngBounds();
              vehicles.forEach(function (vehicle) {
                bounds.extend({ lat: vehicle.lat, lng: vehicle.lng });
              });
              map.fitBounds(bounds);
            }
          }

          window.initMap = initMap;
        </script>
        <script async defer
          src="https://maps.googleapis.com/maps/api/js?key=__API_KEY__&callback=initMap">
        </script>
      </body>
    </html>
"#};

/// Serialize for a `<script>` block: `</` cannot close the tag early
fn script_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Percent-encode everything outside the URL unreserved set
fn url_component(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                char::from(b).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

/// Render the full map document.
///
/// The map centers on the first vehicle, or on `fallback_center`
/// (`[lat, lng]`) when there is none. Vehicles without finite coordinates
/// are left out.
pub fn render_fleet_map(vehicles: &[Vehicle], api_key: &str, fallback_center: [f64; 2]) -> String {
    let placed: Vec<&Vehicle> = vehicles
        .iter()
        .filter(|vehicle| {
            let ok = vehicle.has_position();
            if !ok {
                warn!("Vehicle {} has no usable position, skipping", vehicle.id);
            }
            ok
        })
        .collect();

    let [center_lat, center_lng] = placed
        .first()
        .map(|v| [v.latitude, v.longitude])
        .unwrap_or(fallback_center);

    let markers: Vec<Marker<'_>> = placed.iter().map(|v| Marker::from(*v)).collect();

    // vehicle data goes in last so its text is never searched for placeholders
    TEMPLATE
        .replace("__MOVING_COLOR__", MOVING_COLOR)
        .replace("__STOPPED_COLOR__", STOPPED_COLOR)
        .replace("__ZOOM__", &DEFAULT_ZOOM.to_string())
        .replace("__CENTER_LAT__", &center_lat.to_string())
        .replace("__CENTER_LNG__", &center_lng.to_string())
        .replace("__API_KEY__", &url_component(api_key))
        .replace("__VEHICLES__", &script_json(&markers))
}

/// Map entry for a device from its most recent location point
pub fn vehicle_from_history(device: &Device, points: &[LocationPoint]) -> Option<Vehicle> {
    // Parsed instants rank above unparseable stamps, which rank above none
    let latest = points
        .iter()
        .enumerate()
        .max_by_key(|&(index, point)| {
            let raw = point.recorded_at.as_deref();
            let instant = raw.and_then(|stamp| DateTime::parse_from_rfc3339(stamp).ok());
            (instant.map(|at| at.with_timezone(&Utc)), raw, index)
        })
        .map(|(_, point)| point)?;

    let speed = latest.speed.unwrap_or(0.0);
    let name = if device.serial_number.trim().is_empty() {
        device.imei.clone()
    } else {
        device.serial_number.clone()
    };

    Some(Vehicle {
        id: device.vehicle_id.unwrap_or(device.id),
        name,
        latitude: latest.latitude,
        longitude: latest.longitude,
        status: if speed > 0.0 { "moving" } else { "stopped" }.to_string(),
        speed: format!("{:.0} km/h", speed),
        location: latest.address.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vehicle(id: i64, name: &str, status: &str) -> Vehicle {
        Vehicle {
            id,
            name: name.to_string(),
            latitude: 19.4326,
            longitude: -99.1332,
            status: status.to_string(),
            speed: "40 km/h".to_string(),
            location: None,
        }
    }

    #[test]
    fn test_moving_status_variants() {
        assert!(vehicle(1, "A", "moving").is_moving());
        assert!(vehicle(1, "A", "En Movimiento").is_moving());
        assert!(!vehicle(1, "A", "Detenido").is_moving());
    }

    #[test]
    fn test_empty_fleet_uses_fallback_center() {
        let html = render_fleet_map(&[], "KEY", [-34.6037, -58.3816]);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("center: { lat: -34.6037, lng: -58.3816 }"));
        assert!(html.contains("const vehicles = [];"));
        assert!(html.contains("key=KEY&callback=initMap"));
        assert!(html.contains("zoom: 12"));
        assert!(!html.contains("__"));
    }

    #[test]
    fn test_markers_carry_color_and_label() {
        let html = render_fleet_map(
            &[vehicle(1, "Camión 1", "moving"), vehicle(2, "Van", "stopped")],
            "KEY",
            [0.0, 0.0],
        );
        assert!(html.contains("center: { lat: 19.4326, lng: -99.1332 }"));
        assert!(html.contains(r##""label":"C","color":"#27ae60","moving":true"##));
        assert!(html.contains(r##""label":"V","color":"#e74c3c","moving":false"##));
        assert!(html.contains("vehicles.length > 1"));
    }

    #[test]
    fn test_script_injection_is_neutralized() {
        let mut evil = vehicle(1, "</script><script>alert(1)</script>", "moving");
        evil.location = Some("<b>x</b>".to_string());
        let html = render_fleet_map(&[evil], "a b&c", [0.0, 0.0]);
        assert!(!html.contains("</script><script>alert(1)"));
        assert!(html.contains(r"<\/script>"));
        assert!(html.contains("key=a%20b%26c&callback"));
    }

    #[test]
    fn test_non_finite_positions_are_skipped() {
        let mut lost = vehicle(1, "Lost", "moving");
        lost.latitude = f64::NAN;
        let html = render_fleet_map(&[lost], "KEY", [1.5, 2.5]);
        assert!(html.contains("const vehicles = [];"));
        assert!(html.contains("center: { lat: 1.5, lng: 2.5 }"));
    }

    #[test]
    fn test_vehicle_speed_accepts_numbers() {
        let vehicle: Vehicle = serde_json::from_value(json!({
            "id": 4, "name": "Moto", "latitude": 1.0, "longitude": 2.0, "speed": 35
        }))
        .unwrap();
        assert_eq!(vehicle.speed, "35 km/h");
        assert_eq!(vehicle.status, "");
    }

    #[test]
    fn test_vehicle_from_latest_point() {
        let device: Device = serde_json::from_value(json!({
            "id": 10, "imei": "356938035643809", "serial_number": "", "vehicle_id": 77
        }))
        .unwrap();
        let points: Vec<LocationPoint> = serde_json::from_value(json!([
            {"lat": 1.0, "lng": 1.0, "speed": 0.0, "recorded_at": "2026-10-18T10:00:00Z"},
            {"lat": 2.0, "lng": 2.0, "speed": 52.4, "recorded_at": "2026-10-18T11:00:00Z",
             "address": "Av. Reforma 1"},
            {"lat": 0.5, "lng": 0.5, "recorded_at": "2026-10-18T09:00:00Z"}
        ]))
        .unwrap();

        let vehicle = vehicle_from_history(&device, &points).unwrap();
        assert_eq!(vehicle.id, 77);
        assert_eq!(vehicle.name, "356938035643809");
        assert_eq!(vehicle.latitude, 2.0);
        assert!(vehicle.is_moving());
        assert_eq!(vehicle.speed, "52 km/h");
        assert_eq!(vehicle.location.as_deref(), Some("Av. Reforma 1"));

        assert!(vehicle_from_history(&device, &[]).is_none());
    }

    #[test]
    fn test_latest_point_compares_instants_across_offsets() {
        let device: Device = serde_json::from_value(json!({
            "id": 10, "imei": "356938035643809", "serial_number": "SN-1"
        }))
        .unwrap();
        // 08:30-06:00 is 14:30Z, later than 12:00Z despite sorting lower as text
        let points: Vec<LocationPoint> = serde_json::from_value(json!([
            {"lat": 1.0, "lng": 1.0, "recorded_at": "2026-10-18T12:00:00Z"},
            {"lat": 2.0, "lng": 2.0, "recorded_at": "2026-10-18T08:30:00-06:00"},
            {"lat": 3.0, "lng": 3.0, "recorded_at": "2026-10-18 23:59:59"},
            {"lat": 4.0, "lng": 4.0}
        ]))
        .unwrap();

        let vehicle = vehicle_from_history(&device, &points).unwrap();
        assert_eq!(vehicle.latitude, 2.0);

        // Without parseable stamps the text order decides
        let points: Vec<LocationPoint> = serde_json::from_value(json!([
            {"lat": 1.0, "lng": 1.0, "recorded_at": "2026-10-18 10:00:00"},
            {"lat": 2.0, "lng": 2.0, "recorded_at": "2026-10-18 11:00:00"},
            {"lat": 3.0, "lng": 3.0}
        ]))
        .unwrap();
        let vehicle = vehicle_from_history(&device, &points).unwrap();
        assert_eq!(vehicle.latitude, 2.0);
    }
}
