//! Type-ahead suggestions from a fixed list of popular parts.

use itertools::Itertools;

use super::parser::{normalize_query, QueryParser};
use super::types::VehicleInfo;
use super::vehicle::make_for_model;

/// Default number of suggestions returned.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;

/// Most searched parts, most popular first.
const POPULAR_PARTS: &[&str] = &[
    "brake pads",
    "oil filter",
    "air filter",
    "cabin air filter",
    "spark plugs",
    "wiper blades",
    "battery",
    "brake rotors",
    "headlight bulbs",
    "floor mats",
    "alternator",
    "starter",
    "serpentine belt",
    "radiator",
    "shocks and struts",
    "tail light",
    "fuel pump",
    "ignition coil",
    "oxygen sensor",
    "water pump",
];

/// Suggest completions for a partially typed query.
///
/// Recognized vehicle info (year, make, known model) is kept as a prefix;
/// the rest of the input narrows the popular-parts list by word prefix.
pub fn suggest(parser: &QueryParser, partial: &str, limit: usize) -> Vec<String> {
    if limit == 0 {
        return Vec::new();
    }

    let normalized = normalize_query(partial);
    if normalized.is_empty() {
        return POPULAR_PARTS
            .iter()
            .take(limit)
            .map(|part| part.to_string())
            .collect();
    }

    let parsed = parser.parse(&normalized);
    let (prefix, unknown_model) = vehicle_prefix(&parsed.vehicle_info);

    let fragment: Vec<&str> = unknown_model
        .into_iter()
        .chain(parsed.part_numbers.iter().map(String::as_str))
        .chain(parsed.product_terms.iter().map(String::as_str))
        .collect();

    POPULAR_PARTS
        .iter()
        .filter(|part| matches_fragment(part, &fragment))
        .map(|part| match prefix.as_deref() {
            Some(prefix) => format!("{prefix} {part}"),
            None => part.to_string(),
        })
        .unique()
        .take(limit)
        .collect()
}

/// Display prefix for the recognized vehicle, plus a model the parser
/// guessed but that no make knows.
fn vehicle_prefix(vehicle: &VehicleInfo) -> (Option<String>, Option<&str>) {
    let (known_model, unknown_model) = match vehicle.model.as_deref() {
        Some(model) if make_for_model(model, vehicle.make).is_some() => (Some(model), None),
        Some(model) => (None, Some(model)),
        None => (None, None),
    };

    let known = VehicleInfo {
        model: known_model.map(str::to_string),
        ..vehicle.clone()
    };
    let prefix = Some(known.describe()).filter(|prefix| !prefix.is_empty());
    (prefix, unknown_model)
}

/// Every fragment word must start some word of the part name.
fn matches_fragment(part: &str, fragment: &[&str]) -> bool {
    fragment
        .iter()
        .all(|wanted| part.split(' ').any(|word| word.starts_with(wanted)))
}
