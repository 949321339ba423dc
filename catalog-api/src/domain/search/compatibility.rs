//! Heuristic vehicle compatibility from product text.
//!
//! The generated descriptors are ranking signals, not certified fitment.

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use strum::IntoEnumIterator;

use super::types::{MatchType, VehicleDescriptor};
use super::vehicle::{contains_word, is_model_year, model_mentioned_in, Make, POPULAR_MAKES};
use crate::domain::clock::Clock;

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

/// Part categories that are usually sold per vehicle.
const PART_CATEGORIES: &[&str] = &[
    "oil filter",
    "air filter",
    "cabin filter",
    "cabin air filter",
    "fuel filter",
    "brake pad",
    "brake rotor",
    "brake caliper",
    "spark plug",
    "ignition coil",
    "timing belt",
    "serpentine belt",
    "shock absorber",
    "strut",
    "headlight",
    "tail light",
    "taillight",
    "wiper blade",
    "alternator",
    "starter",
    "radiator",
    "water pump",
    "fuel pump",
    "oxygen sensor",
    "wheel bearing",
    "control arm",
];

/// Parts that fit nearly anything.
const UNIVERSAL_PARTS: &[&str] = &[
    "battery",
    "batteries",
    "oil",
    "coolant",
    "brake fluid",
    "fuse",
    "relay",
];

/// Models distinctive enough to identify a vehicle without its make.
const DISTINCTIVE_MODELS: &[(Make, &str)] = &[
    (Make::Toyota, "camry"),
    (Make::Toyota, "corolla"),
    (Make::Toyota, "rav-4"),
    (Make::Toyota, "tacoma"),
    (Make::Honda, "civic"),
    (Make::Honda, "accord"),
    (Make::Honda, "cr-v"),
    (Make::Ford, "f-150"),
    (Make::Ford, "mustang"),
    (Make::Chevrolet, "silverado"),
    (Make::Chevrolet, "malibu"),
    (Make::Nissan, "altima"),
    (Make::Nissan, "rogue"),
    (Make::Jeep, "wrangler"),
    (Make::Subaru, "outback"),
    (Make::Hyundai, "elantra"),
];

fn production_years(make: Make, model: &str) -> Option<RangeInclusive<u16>> {
    match (make, model) {
        (Make::Toyota, "camry") => Some(2018..=2024),
        (Make::Toyota, "corolla") => Some(2019..=2024),
        (Make::Toyota, "rav-4") => Some(2019..=2024),
        (Make::Honda, "civic") => Some(2016..=2021),
        (Make::Honda, "accord") => Some(2018..=2022),
        (Make::Ford, "f-150") => Some(2015..=2020),
        (Make::Chevrolet, "silverado") => Some(2019..=2024),
        _ => None,
    }
}

/// Plural-tolerant whole-word mention ("brake pads" mentions "brake pad").
fn mentions(text: &str, term: &str) -> bool {
    contains_word(text, term) || contains_word(text, &format!("{term}s"))
}

/// Generator for an item's compatibility list.
#[derive(Debug, Clone, Copy)]
pub struct CompatibilityGenerator {
    reference_year: u16,
}

impl CompatibilityGenerator {
    pub fn new(reference_year: u16) -> Self {
        Self { reference_year }
    }

    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::new(clock.current_year())
    }

    /// Derive compatibility descriptors from an item's name and description.
    ///
    /// Returns an empty list when nothing in the text identifies a vehicle
    /// or a part kind.
    pub fn generate(&self, name: &str, description: &str) -> Vec<VehicleDescriptor> {
        let text = format!("{name} {description}").to_lowercase();
        let years = self.candidate_years(&text);

        let mut descriptors = self.from_vehicle_mentions(&text, &years);

        if descriptors.is_empty() {
            descriptors = self.from_part_category(&text);
        }
        if descriptors.is_empty() {
            descriptors = self.universal_fallback(&text);
        }

        descriptors
            .into_iter()
            .unique_by(|d| (d.year, d.make, d.model.clone()))
            .collect()
    }

    /// Four-digit years in order of first appearance, within bounds.
    fn candidate_years(&self, text: &str) -> Vec<u16> {
        YEAR_PATTERN
            .find_iter(text)
            .filter_map(|m| m.as_str().parse::<u16>().ok())
            .filter(|year| is_model_year(*year, self.reference_year))
            .unique()
            .collect()
    }

    fn from_vehicle_mentions(&self, text: &str, years: &[u16]) -> Vec<VehicleDescriptor> {
        let mut descriptors = Vec::new();

        for make in Make::iter().filter(|make| make.mentioned_in(text)) {
            let models: Vec<&str> = make
                .models()
                .iter()
                .copied()
                .filter(|model| model_mentioned_in(model, text))
                .collect();

            match (years.is_empty(), models.is_empty()) {
                (false, false) => {
                    for &year in years {
                        for &model in &models {
                            descriptors.push(VehicleDescriptor::new(
                                Some(year),
                                Some(make),
                                Some(model),
                                MatchType::Specific,
                            ));
                        }
                    }
                }
                (true, false) => {
                    for &model in &models {
                        descriptors.push(VehicleDescriptor::new(
                            None,
                            Some(make),
                            Some(model),
                            MatchType::Model,
                        ));
                    }
                }
                (false, true) => {
                    for &year in years {
                        descriptors.push(VehicleDescriptor::new(
                            Some(year),
                            Some(make),
                            None,
                            MatchType::MakeYear,
                        ));
                    }
                }
                (true, true) => {
                    descriptors.push(VehicleDescriptor::new(None, Some(make), None, MatchType::Make));
                }
            }
        }

        if descriptors.is_empty() {
            for &year in years {
                descriptors.push(VehicleDescriptor::new(Some(year), None, None, MatchType::Year));
            }
        }

        descriptors
    }

    /// Part text that names a model without its make ("Camry brake pads").
    fn from_part_category(&self, text: &str) -> Vec<VehicleDescriptor> {
        if !PART_CATEGORIES.iter().any(|category| mentions(text, category)) {
            return Vec::new();
        }

        let Some(&(make, model)) = DISTINCTIVE_MODELS
            .iter()
            .find(|(_, model)| model_mentioned_in(model, text))
        else {
            return Vec::new();
        };

        let years: Vec<u16> = match production_years(make, model) {
            Some(range) => range.collect(),
            None => self.recent_years(3),
        };

        years
            .into_iter()
            .map(|year| VehicleDescriptor::new(Some(year), Some(make), Some(model), MatchType::Specific))
            .collect()
    }

    /// Broad, deliberately small signal for parts that fit nearly anything:
    /// the most popular makes for the two most recent years.
    fn universal_fallback(&self, text: &str) -> Vec<VehicleDescriptor> {
        if !UNIVERSAL_PARTS.iter().any(|part| mentions(text, part)) {
            return Vec::new();
        }

        let years = self.recent_years(2);
        POPULAR_MAKES
            .iter()
            .flat_map(|&make| {
                years
                    .iter()
                    .map(move |&year| VehicleDescriptor::new(Some(year), Some(make), None, MatchType::MakeYear))
            })
            .collect()
    }

    /// The `count` years ending at the reference year, oldest first.
    fn recent_years(&self, count: u16) -> Vec<u16> {
        let last = self.reference_year;
        (last.saturating_sub(count - 1)..=last).collect()
    }
}

/// Append generated descriptors the existing list does not already hold.
///
/// Existing order is preserved; returns the merged list.
pub fn merge_compatibility(
    existing: &[VehicleDescriptor],
    generated: &[VehicleDescriptor],
) -> Vec<VehicleDescriptor> {
    let mut merged = existing.to_vec();
    for descriptor in generated {
        if !merged.iter().any(|d| d.key() == descriptor.key()) {
            merged.push(descriptor.clone());
        }
    }
    merged
}
