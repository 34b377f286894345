//! Core type definitions using newtype patterns for type safety.
//!
//! Identities, hardware addresses, and light state are small value types so
//! that a synthetic device id can never be confused with a MAC string and an
//! out-of-range brightness never reaches the wire.

mod device;
mod mac;
mod scan_id;
mod state;

pub use device::{Confidence, Device, DeviceId, DevicePatch};
pub use mac::{MacAddress, MacParseError};
pub use scan_id::ScanId;
pub use state::{
    clamp_brightness, clamp_color_temp, clamp_speed, DeviceState, Rgb, StateUpdate,
    BRIGHTNESS_MAX, BRIGHTNESS_MIN, COLOR_TEMP_MAX, COLOR_TEMP_MIN, DEFAULT_SCENE_SPEED,
    SPEED_MAX,
};
