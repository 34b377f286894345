//! Light state value objects.
//!
//! `DeviceState` is the canonical shape stored on a device record.
//! `StateUpdate` is a partial state used by setters; only the fields that are
//! present end up on the wire. Numeric ranges are enforced by `clamped()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest brightness the firmware accepts (percent).
pub const BRIGHTNESS_MIN: u8 = 10;
/// Highest brightness (percent).
pub const BRIGHTNESS_MAX: u8 = 100;
/// Warmest white supported (Kelvin).
pub const COLOR_TEMP_MIN: u16 = 2200;
/// Coolest white supported (Kelvin).
pub const COLOR_TEMP_MAX: u16 = 6500;
/// Fastest scene animation speed.
pub const SPEED_MAX: u8 = 200;
/// Speed used when a scene is set without an explicit rate.
pub const DEFAULT_SCENE_SPEED: u8 = 100;

/// Clamp a brightness percentage into the supported range.
pub fn clamp_brightness(value: u8) -> u8 {
    value.clamp(BRIGHTNESS_MIN, BRIGHTNESS_MAX)
}

/// Clamp a color temperature into the supported range.
pub fn clamp_color_temp(value: u16) -> u16 {
    value.clamp(COLOR_TEMP_MIN, COLOR_TEMP_MAX)
}

/// Clamp a scene animation speed into the supported range.
pub fn clamp_speed(value: u8) -> u8 {
    value.min(SPEED_MAX)
}

/// An RGB color. Channels are `u8`, so the 0-255 range holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Parse `"r,g,b"`. Channel values above 255 saturate.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let channels: Vec<&str> = s.split(',').map(str::trim).collect();
        if channels.len() != 3 {
            return Err(format!("expected r,g,b but got '{}'", s));
        }
        let mut parsed = [0u8; 3];
        for (slot, raw) in parsed.iter_mut().zip(&channels) {
            let value: i64 = raw
                .parse()
                .map_err(|_| format!("invalid color channel: {}", raw))?;
            *slot = value.clamp(0, 255) as u8;
        }
        Ok(Self::new(parsed[0], parsed[1], parsed[2]))
    }
}

/// Current state of a light.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    /// Whether the light is on. Unknown is reported as off.
    #[serde(default)]
    pub power: bool,
    /// Brightness percentage (10-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    /// White color temperature in Kelvin (2200-6500).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temp: Option<u16>,
    /// RGB color, when in color mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb: Option<Rgb>,
    /// Scene animation rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u8>,
    /// Active preset scene.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<u16>,
}

impl DeviceState {
    /// Return a copy with every numeric field forced into range.
    pub fn clamped(&self) -> Self {
        Self {
            power: self.power,
            brightness: self.brightness.map(clamp_brightness),
            color_temp: self.color_temp.map(clamp_color_temp),
            rgb: self.rgb,
            speed: self.speed.map(clamp_speed),
            scene_id: self.scene_id,
        }
    }
}

/// A partial state change. Absent fields are left untouched on the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temp: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rgb: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<u16>,
}

impl StateUpdate {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.power.is_none()
            && self.brightness.is_none()
            && self.color_temp.is_none()
            && self.rgb.is_none()
            && self.speed.is_none()
            && self.scene_id.is_none()
    }

    /// Return a copy with every numeric field forced into range.
    pub fn clamped(&self) -> Self {
        Self {
            power: self.power,
            brightness: self.brightness.map(clamp_brightness),
            color_temp: self.color_temp.map(clamp_color_temp),
            rgb: self.rgb,
            speed: self.speed.map(clamp_speed),
            scene_id: self.scene_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_ranges() {
        assert_eq!(clamp_brightness(0), 10);
        assert_eq!(clamp_brightness(150), 100);
        assert_eq!(clamp_brightness(55), 55);
        assert_eq!(clamp_color_temp(1000), 2200);
        assert_eq!(clamp_color_temp(9000), 6500);
        assert_eq!(clamp_speed(255), 200);
    }

    #[test]
    fn test_rgb_parse() {
        assert_eq!("255,0,10".parse::<Rgb>().unwrap(), Rgb::new(255, 0, 10));
        assert_eq!("300, -4, 7".parse::<Rgb>().unwrap(), Rgb::new(255, 0, 7));
        assert!("1,2".parse::<Rgb>().is_err());
        assert!("a,b,c".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let state = DeviceState {
            power: true,
            brightness: Some(80),
            color_temp: Some(4000),
            scene_id: Some(11),
            ..Default::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["colorTemp"], 4000);
        assert_eq!(json["sceneId"], 11);
        assert!(json.get("rgb").is_none());
    }
}
