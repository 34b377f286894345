//! Wire messages for the bulb control protocol.
//!
//! Requests and replies are single UTF-8 JSON datagrams:
//!
//! ```text
//! -> {"method":"setPilot","params":{"state":true,"dimming":80}}
//! <- {"method":"setPilot","env":"pro","result":{"success":true}}
//! ```
//!
//! Method and field names come from the bulb firmware and must not change.

use crate::types::{
    clamp_brightness, clamp_color_temp, clamp_speed, DeviceState, MacAddress, Rgb, StateUpdate,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// UDP port the bulbs listen on.
pub const WIZ_PORT: u16 = 38899;

/// Protocol methods used by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Query current state; also the discovery probe.
    GetPilot,
    /// Change state.
    SetPilot,
    /// Query firmware and module details.
    GetSystemConfig,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetPilot => "getPilot",
            Self::SetPilot => "setPilot",
            Self::GetSystemConfig => "getSystemConfig",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a `setPilot` request. Absent fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PilotParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimming: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub g: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b: Option<u8>,
    #[serde(rename = "sceneId", skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<u8>,
}

impl From<&StateUpdate> for PilotParams {
    fn from(update: &StateUpdate) -> Self {
        let update = update.clamped();
        Self {
            state: update.power,
            dimming: update.brightness,
            temp: update.color_temp,
            r: update.rgb.map(|c| c.r),
            g: update.rgb.map(|c| c.g),
            b: update.rgb.map(|c| c.b),
            scene_id: update.scene_id,
            speed: update.speed,
        }
    }
}

/// An outgoing request.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    method: &'static str,
    params: Value,
}

impl Request {
    /// `getPilot` with empty params.
    pub fn get_pilot() -> Self {
        Self::empty(Method::GetPilot)
    }

    /// `getSystemConfig` with empty params.
    pub fn get_system_config() -> Self {
        Self::empty(Method::GetSystemConfig)
    }

    /// `setPilot` carrying the given parameters.
    pub fn set_pilot(params: &PilotParams) -> serde_json::Result<Self> {
        Ok(Self {
            method: Method::SetPilot.as_str(),
            params: serde_json::to_value(params)?,
        })
    }

    fn empty(method: Method) -> Self {
        Self {
            method: method.as_str(),
            params: Value::Object(Default::default()),
        }
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Encode as a datagram payload.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// The `error` object of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// A decoded reply.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// The `result` payload of a `getPilot` reply.
///
/// Numeric fields are read as wide integers and narrowed by
/// [`Pilot::to_state`], since firmware revisions are not consistent about
/// ranges.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Pilot {
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub rssi: Option<i32>,
    #[serde(default)]
    pub state: Option<bool>,
    #[serde(default)]
    pub dimming: Option<i64>,
    #[serde(default)]
    pub temp: Option<i64>,
    #[serde(default)]
    pub r: Option<i64>,
    #[serde(default)]
    pub g: Option<i64>,
    #[serde(default)]
    pub b: Option<i64>,
    #[serde(default, rename = "sceneId")]
    pub scene_id: Option<u16>,
    #[serde(default)]
    pub speed: Option<i64>,
}

impl Pilot {
    /// The reported hardware address, if present and well formed.
    pub fn mac_address(&self) -> Option<MacAddress> {
        self.mac.as_deref().and_then(|raw| raw.parse().ok())
    }

    /// Normalize into the canonical state shape, clamping every numeric field.
    pub fn to_state(&self) -> DeviceState {
        let channel = |v: i64| v.clamp(0, 255) as u8;
        let rgb = match (self.r, self.g, self.b) {
            (Some(r), Some(g), Some(b)) => Some(Rgb::new(channel(r), channel(g), channel(b))),
            _ => None,
        };

        DeviceState {
            power: self.state.unwrap_or(false),
            brightness: self
                .dimming
                .map(|v| clamp_brightness(v.clamp(0, 255) as u8)),
            color_temp: self
                .temp
                .map(|v| clamp_color_temp(v.clamp(0, i64::from(u16::MAX)) as u16)),
            rgb,
            speed: self.speed.map(|v| clamp_speed(v.clamp(0, 255) as u8)),
            scene_id: self.scene_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_pilot_encoding() {
        let bytes = Request::get_pilot().to_bytes().unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["method"], "getPilot");
        assert!(value["params"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_set_pilot_only_present_fields() {
        let update = StateUpdate {
            power: Some(true),
            brightness: Some(250),
            rgb: Some(Rgb::new(255, 10, 0)),
            ..Default::default()
        };
        let request = Request::set_pilot(&PilotParams::from(&update)).unwrap();
        let value: Value = serde_json::from_slice(&request.to_bytes().unwrap()).unwrap();
        let params = value["params"].as_object().unwrap();
        assert_eq!(value["method"], "setPilot");
        assert_eq!(params["state"], true);
        assert_eq!(params["dimming"], 100);
        assert_eq!(params["r"], 255);
        assert_eq!(params["g"], 10);
        assert_eq!(params["b"], 0);
        assert!(!params.contains_key("temp"));
        assert!(!params.contains_key("sceneId"));
    }

    #[test]
    fn test_decode_pilot_reply() {
        let raw = r#"{"method":"getPilot","env":"pro","result":{"mac":"a8bb5006033d","rssi":-62,"src":"","state":true,"sceneId":0,"temp":4000,"dimming":80}}"#;
        let response: Response = serde_json::from_str(raw).unwrap();
        assert!(response.error.is_none());
        let pilot: Pilot = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(pilot.rssi, Some(-62));
        assert_eq!(
            pilot.mac_address().unwrap().to_string(),
            "a8:bb:50:06:03:3d"
        );

        let state = pilot.to_state();
        assert!(state.power);
        assert_eq!(state.brightness, Some(80));
        assert_eq!(state.color_temp, Some(4000));
        assert_eq!(state.rgb, None);
        assert_eq!(state.scene_id, Some(0));
    }

    #[test]
    fn test_pilot_state_clamps_out_of_range() {
        let pilot = Pilot {
            dimming: Some(0),
            temp: Some(12000),
            r: Some(300),
            g: Some(-5),
            b: Some(20),
            speed: Some(900),
            ..Default::default()
        };
        let state = pilot.to_state();
        assert!(!state.power);
        assert_eq!(state.brightness, Some(10));
        assert_eq!(state.color_temp, Some(6500));
        assert_eq!(state.rgb, Some(Rgb::new(255, 0, 20)));
        assert_eq!(state.speed, Some(200));
    }

    #[test]
    fn test_decode_error_reply() {
        let raw = r#"{"method":"setPilot","error":{"code":-32600,"message":"Invalid Request"}}"#;
        let response: Response = serde_json::from_str(raw).unwrap();
        assert_eq!(response.error.unwrap().code, -32600);
        assert!(response.result.is_none());
    }
}
