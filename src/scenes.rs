//! Built-in firmware scenes.
//!
//! Provides mapping between scene ids and their names.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Scene ids shipped in bulb firmware, in id order.
pub const SCENES: &[(u16, &str)] = &[
    (1, "Ocean"),
    (2, "Romance"),
    (3, "Sunset"),
    (4, "Party"),
    (5, "Fireplace"),
    (6, "Cozy"),
    (7, "Forest"),
    (8, "Pastel Colors"),
    (9, "Wake up"),
    (10, "Bedtime"),
    (11, "Warm White"),
    (12, "Daylight"),
    (13, "Cool white"),
    (14, "Night light"),
    (15, "Focus"),
    (16, "Relax"),
    (17, "True colors"),
    (18, "TV time"),
    (19, "Plantgrowth"),
    (20, "Spring"),
    (21, "Summer"),
    (22, "Fall"),
    (23, "Deepdive"),
    (24, "Jungle"),
    (25, "Mojito"),
    (26, "Club"),
    (27, "Christmas"),
    (28, "Halloween"),
    (29, "Candlelight"),
    (30, "Golden white"),
    (31, "Pulse"),
    (32, "Steampunk"),
    (1000, "Rhythm"),
];

/// Lowercased name to id.
static BY_NAME: LazyLock<HashMap<String, u16>> = LazyLock::new(|| {
    SCENES
        .iter()
        .map(|(id, name)| (normalize(name), *id))
        .collect()
});

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Get the name of a scene by id.
pub fn scene_name(id: u16) -> Option<&'static str> {
    SCENES
        .iter()
        .find(|(scene, _)| *scene == id)
        .map(|(_, name)| *name)
}

/// Get a scene id by case-insensitive name.
pub fn scene_id(name: &str) -> Option<u16> {
    BY_NAME.get(&normalize(name)).copied()
}

/// Resolve user input that is either a numeric id or a scene name.
pub fn resolve(input: &str) -> Option<u16> {
    match input.trim().parse::<u16>() {
        Ok(id) => scene_name(id).map(|_| id),
        Err(_) => scene_id(input),
    }
}
