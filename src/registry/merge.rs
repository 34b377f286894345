//! Reconciliation of a fresh observation against a known record.
//!
//! A candidate replaces the existing record when it carries strictly more
//! informative fields, or strictly higher confidence. Replacement is a
//! field-level union, never a wholesale overwrite, and confidence only moves
//! when either side is `high`. Whatever the decision, `last_seen` advances.

use crate::types::{Confidence, Device};
use chrono::{DateTime, Utc};

/// Result of merging one candidate into the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// No record existed under this identity.
    Inserted(Device),
    /// The candidate won and its fields were unioned in.
    Replaced(Device),
    /// The existing record was kept; only `last_seen` moved.
    Refreshed(Device),
}

impl MergeOutcome {
    /// The record as it now stands in the registry.
    pub fn device(&self) -> &Device {
        match self {
            Self::Inserted(d) | Self::Replaced(d) | Self::Refreshed(d) => d,
        }
    }

    pub fn into_device(self) -> Device {
        match self {
            Self::Inserted(d) | Self::Replaced(d) | Self::Refreshed(d) => d,
        }
    }

    /// Whether this outcome created a new registry entry.
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Count informative fields: `mac`, `rssi`, and `power`, `brightness`,
/// `colorTemp`, `sceneId` within state.
///
/// `power` is always present on a record, so it adds one to every count.
pub fn feature_count(device: &Device) -> usize {
    [
        device.mac.is_some(),
        device.rssi.is_some(),
        true,
        device.state.brightness.is_some(),
        device.state.color_temp.is_some(),
        device.state.scene_id.is_some(),
    ]
    .into_iter()
    .filter(|present| *present)
    .count()
}

/// Whether `candidate` should replace `existing`.
pub fn should_replace(existing: &Device, candidate: &Device) -> bool {
    feature_count(candidate) > feature_count(existing) || candidate.confidence > existing.confidence
}

/// Union `candidate` into `existing`, preferring candidate values.
pub fn union(existing: &Device, candidate: &Device, now: DateTime<Utc>) -> Device {
    let mut groups = existing.groups.clone();
    groups.extend(candidate.groups.iter().cloned());

    let old = &existing.state;
    let new = &candidate.state;

    Device {
        id: existing.id.clone(),
        ip: candidate.ip,
        mac: candidate.mac.or(existing.mac),
        confidence: merged_confidence(existing.confidence, candidate.confidence),
        last_seen: existing.last_seen.max(now),
        rssi: candidate.rssi.or(existing.rssi),
        state: crate::types::DeviceState {
            power: new.power,
            brightness: new.brightness.or(old.brightness),
            color_temp: new.color_temp.or(old.color_temp),
            rgb: new.rgb.or(old.rgb),
            speed: new.speed.or(old.speed),
            scene_id: new.scene_id.or(old.scene_id),
        }
        .clamped(),
        groups,
    }
}

/// `high` if either side is `high`, otherwise whatever the record already had.
pub fn merged_confidence(existing: Confidence, candidate: Confidence) -> Confidence {
    if existing == Confidence::High || candidate == Confidence::High {
        Confidence::High
    } else {
        existing
    }
}

/// Keep `existing` untouched apart from `last_seen`.
pub fn refresh(existing: &Device, now: DateTime<Utc>) -> Device {
    let mut device = existing.clone();
    device.last_seen = existing.last_seen.max(now);
    device
}

/// Decide and apply the merge for one candidate.
pub fn reconcile(existing: Option<&Device>, candidate: Device, now: DateTime<Utc>) -> MergeOutcome {
    match existing {
        None => {
            let mut device = candidate;
            device.last_seen = now;
            device.state = device.state.clamped();
            MergeOutcome::Inserted(device)
        }
        Some(existing) if should_replace(existing, &candidate) => {
            MergeOutcome::Replaced(union(existing, &candidate, now))
        }
        Some(existing) => MergeOutcome::Refreshed(refresh(existing, now)),
    }
}
