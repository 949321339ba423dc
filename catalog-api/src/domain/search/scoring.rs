//! Relevance scoring for catalog items against a parsed query.
//!
//! Every contribution is additive and evaluated independently, so an exact
//! part-number hit also earns the partial-containment weight.

use std::cmp::Ordering;

use super::types::{CatalogItem, MatchType, ParsedQuery, ScoredItem, VehicleDescriptor, VehicleInfo};
use super::vehicle::{contains_word, model_variants};

const BASELINE: f64 = 1.0;

// Part numbers
const PART_NUMBER_EXACT: f64 = 15.0;
const SKU_EXACT: f64 = 12.0;
const PART_NUMBER_PARTIAL: f64 = 8.0;
const SKU_PARTIAL: f64 = 6.0;
const PART_NUMBER_IN_NAME: f64 = 4.0;
const PART_NUMBER_IN_DESCRIPTION: f64 = 2.0;

// Vehicle fields
const VEHICLE_IN_NAME: f64 = 3.0;
const VEHICLE_IN_DESCRIPTION: f64 = 2.0;
const VEHICLE_IN_SHORT_DESCRIPTION: f64 = 2.5;
const VEHICLE_IN_SKU: f64 = 2.0;
const YEAR_IN_PART_NUMBER: f64 = 2.5;

// Compatibility
const COMPATIBLE_FIELD: f64 = 3.0;
const COMPATIBLE_SPECIFIC: f64 = 5.0;

// Product terms
const TERM_IN_NAME: f64 = 2.0;
const TERM_IN_DESCRIPTION: f64 = 1.0;
const TERM_IN_SHORT_DESCRIPTION: f64 = 1.5;
const TERM_IN_SKU: f64 = 1.5;
const TERM_IN_PART_NUMBER: f64 = 1.5;

/// Terms too generic to say anything about an item.
const IGNORED_TERMS: &[&str] = &["parts", "accessories"];

/// Lowercased text fields of an item.
struct ItemText {
    name: String,
    description: String,
    short_description: String,
    sku: String,
    part_number: String,
}

impl ItemText {
    fn new(item: &CatalogItem) -> Self {
        let lower = |field: &Option<String>| field.as_deref().unwrap_or_default().to_lowercase();
        Self {
            name: item.name.to_lowercase(),
            description: lower(&item.description),
            short_description: lower(&item.short_description),
            sku: lower(&item.sku),
            part_number: lower(&item.part_number),
        }
    }
}

/// Score one item. Returns 0.0 when there is no query.
pub fn score(item: &CatalogItem, parsed: &ParsedQuery) -> f64 {
    let raw = parsed.original_query.trim().to_lowercase();
    if raw.is_empty() {
        return 0.0;
    }

    let text = ItemText::new(item);
    let mut score = BASELINE;

    for part_number in &parsed.part_numbers {
        score += part_number_score(&text, part_number);
    }

    score += vehicle_field_score(&text, &parsed.vehicle_info);
    score += compatibility_bonus(&item.compatibility, &parsed.vehicle_info);

    for term in parsed
        .product_terms
        .iter()
        .filter(|term| !IGNORED_TERMS.contains(&term.as_str()))
    {
        score += term_score(&text, term);
    }

    if parsed.is_unstructured() {
        score += term_score(&text, &raw);
    }

    score
}

/// Score items and sort them best first.
///
/// Ties break on stock quantity, then on creation time, both descending.
pub fn rank(items: Vec<CatalogItem>, parsed: &ParsedQuery) -> Vec<ScoredItem> {
    let mut scored = score_in_place(items, Some(parsed));
    scored.sort_by(compare_ranked);
    scored
}

/// Attach scores without reordering. Items score 0.0 without a query.
pub fn score_in_place(items: Vec<CatalogItem>, parsed: Option<&ParsedQuery>) -> Vec<ScoredItem> {
    items
        .into_iter()
        .map(|item| {
            let relevance_score = parsed.map_or(0.0, |parsed| score(&item, parsed));
            ScoredItem {
                item,
                relevance_score,
            }
        })
        .collect()
}

fn compare_ranked(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then_with(|| b.item.stock_quantity.cmp(&a.item.stock_quantity))
        .then_with(|| b.item.created_at.cmp(&a.item.created_at))
}

fn part_number_score(text: &ItemText, part_number: &str) -> f64 {
    let part_number = part_number.to_lowercase();
    let mut score = 0.0;

    if !text.part_number.is_empty() && text.part_number == part_number {
        score += PART_NUMBER_EXACT;
    }
    if !text.sku.is_empty() && text.sku == part_number {
        score += SKU_EXACT;
    }
    if text.part_number.contains(&part_number) {
        score += PART_NUMBER_PARTIAL;
    }
    if text.sku.contains(&part_number) {
        score += SKU_PARTIAL;
    }
    if text.name.contains(&part_number) {
        score += PART_NUMBER_IN_NAME;
    }
    if text.description.contains(&part_number) {
        score += PART_NUMBER_IN_DESCRIPTION;
    }

    score
}

fn vehicle_field_score(text: &ItemText, vehicle: &VehicleInfo) -> f64 {
    let mut score = 0.0;

    if let Some(year) = vehicle.year {
        let year = year.to_string();
        score += spelling_score(text, &[year.clone()]);
        if text.part_number.contains(&year) {
            score += YEAR_IN_PART_NUMBER;
        }
    }
    if let Some(make) = vehicle.make {
        score += spelling_score(text, &make.spellings());
    }
    if let Some(ref model) = vehicle.model {
        score += spelling_score(text, &model_variants(model));
    }

    score
}

/// Field weights for a vehicle attribute found under any of its spellings.
///
/// Prose fields match at word boundaries; codes such as SKUs are compact,
/// so they match on any substring.
fn spelling_score(text: &ItemText, spellings: &[String]) -> f64 {
    let found = |field: &str| spellings.iter().any(|s| contains_word(field, s));
    let mut score = 0.0;

    if found(&text.name) {
        score += VEHICLE_IN_NAME;
    }
    if found(&text.description) {
        score += VEHICLE_IN_DESCRIPTION;
    }
    if found(&text.short_description) {
        score += VEHICLE_IN_SHORT_DESCRIPTION;
    }
    if spellings.iter().any(|s| text.sku.contains(s.as_str())) {
        score += VEHICLE_IN_SKU;
    }

    score
}

/// Best single-descriptor match; descriptors are never summed.
fn compatibility_bonus(compatibility: &[VehicleDescriptor], vehicle: &VehicleInfo) -> f64 {
    if vehicle.is_empty() {
        return 0.0;
    }

    compatibility
        .iter()
        .map(|descriptor| descriptor_score(descriptor, vehicle))
        .fold(0.0, f64::max)
}

fn descriptor_score(descriptor: &VehicleDescriptor, vehicle: &VehicleInfo) -> f64 {
    let year = vehicle.year.is_some() && descriptor.year == vehicle.year;
    let make = vehicle.make.is_some() && descriptor.make == vehicle.make;
    let model = vehicle.model.is_some() && descriptor.model == vehicle.model;

    let mut score = [year, make, model]
        .iter()
        .filter(|matched| **matched)
        .count() as f64
        * COMPATIBLE_FIELD;

    if year && make && model && descriptor.match_type == MatchType::Specific {
        score += COMPATIBLE_SPECIFIC;
    }

    score
}

fn term_score(text: &ItemText, term: &str) -> f64 {
    let mut score = 0.0;

    if text.name.contains(term) {
        score += TERM_IN_NAME;
    }
    if text.description.contains(term) {
        score += TERM_IN_DESCRIPTION;
    }
    if text.short_description.contains(term) {
        score += TERM_IN_SHORT_DESCRIPTION;
    }
    if text.sku.contains(term) {
        score += TERM_IN_SKU;
    }
    if text.part_number.contains(term) {
        score += TERM_IN_PART_NUMBER;
    }

    score
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::search::parser::QueryParser;
    use crate::domain::search::test_util::item;
    use crate::domain::search::types::ItemId;
    use crate::domain::search::vehicle::Make;

    fn parse(query: &str) -> ParsedQuery {
        QueryParser::new(2025).parse(query)
    }

    #[test]
    fn empty_query_scores_zero() {
        assert_eq!(score(&item(1, "Brake pads"), &parse("")), 0.0);
        assert_eq!(score(&item(1, "Brake pads"), &parse("   ")), 0.0);
    }

    #[test]
    fn baseline_for_unrelated_item() {
        assert_eq!(score(&item(1, "Floor mats"), &parse("brake pads")), BASELINE);
    }

    #[test]
    fn exact_part_number_match_raises_score() {
        let plain = item(1, "Brake pads");
        let mut with_part_number = plain.clone();
        with_part_number.part_number = Some("ABC-1234".to_string());

        let parsed = parse("abc-1234");
        let before = score(&plain, &parsed);
        let after = score(&with_part_number, &parsed);

        assert!(after > before);
        assert_eq!(after - before, PART_NUMBER_EXACT + PART_NUMBER_PARTIAL);
    }

    #[test]
    fn part_number_weights_are_independent() {
        let mut target = item(1, "Pad set abc-1234");
        target.sku = Some("ABC-1234".to_string());
        target.description = Some("Replaces abc-1234-x".to_string());

        let expected = BASELINE + SKU_EXACT + SKU_PARTIAL + PART_NUMBER_IN_NAME + PART_NUMBER_IN_DESCRIPTION;
        assert_eq!(score(&target, &parse("abc-1234")), expected);
    }

    #[test]
    fn vehicle_fields_score_per_text_field() {
        let mut target = item(1, "Toyota RAV4 cabin filter");
        target.short_description = Some("Fits 2016 rav-4".to_string());
        target.part_number = Some("CF-2016-R".to_string());

        let parsed = parse("2016 toyota rav4");
        let expected = BASELINE
            // year: short description, part number
            + VEHICLE_IN_SHORT_DESCRIPTION
            + YEAR_IN_PART_NUMBER
            // make: name
            + VEHICLE_IN_NAME
            // model: name, short description
            + VEHICLE_IN_NAME
            + VEHICLE_IN_SHORT_DESCRIPTION;
        assert_eq!(score(&target, &parsed), expected);
    }

    #[test]
    fn vehicle_fields_match_inside_compact_codes() {
        let plain = item(1, "Brake pads");

        let mut coded = plain.clone();
        coded.part_number = Some("BP2016TY".to_string());
        let parsed = parse("2016");
        assert_eq!(
            score(&coded, &parsed) - score(&plain, &parsed),
            YEAR_IN_PART_NUMBER
        );

        let mut coded = plain.clone();
        coded.sku = Some("TOYOTA123".to_string());
        let parsed = parse("toyota");
        assert_eq!(
            score(&coded, &parsed) - score(&plain, &parsed),
            VEHICLE_IN_SKU
        );
    }

    #[test]
    fn compatibility_bonus_takes_best_descriptor() {
        let mut target = item(1, "Floor liners");
        target.compatibility = vec![
            VehicleDescriptor::new(None, Some(Make::Toyota), None, MatchType::Make),
            VehicleDescriptor::new(Some(2016), Some(Make::Toyota), Some("rav-4"), MatchType::Specific),
            VehicleDescriptor::new(Some(2016), None, None, MatchType::Year),
        ];

        let parsed = parse("2016 toyota rav4");
        let expected = BASELINE + 3.0 * COMPATIBLE_FIELD + COMPATIBLE_SPECIFIC;
        assert_eq!(score(&target, &parsed), expected);
    }

    #[test]
    fn specific_bonus_requires_specific_match_type() {
        let mut target = item(1, "Floor liners");
        target.compatibility = vec![VehicleDescriptor::new(
            Some(2016),
            Some(Make::Toyota),
            Some("rav-4"),
            MatchType::Model,
        )];

        let parsed = parse("2016 toyota rav4");
        assert_eq!(score(&target, &parsed), BASELINE + 3.0 * COMPATIBLE_FIELD);
    }

    #[test]
    fn generic_terms_ignored() {
        let target = item(1, "Interior accessories");
        assert_eq!(score(&target, &parse("accessories")), BASELINE);
    }

    #[test]
    fn product_terms_score_per_field() {
        let mut target = item(1, "Ceramic brake pads");
        target.description = Some("Low dust ceramic compound".to_string());

        let parsed = parse("ceramic");
        assert_eq!(score(&target, &parsed), BASELINE + TERM_IN_NAME + TERM_IN_DESCRIPTION);
    }

    #[test]
    fn unstructured_query_falls_back_to_raw_text() {
        let target = item(1, "Part X");
        let parsed = parse("X");
        assert!(parsed.is_unstructured());
        assert_eq!(score(&target, &parsed), BASELINE + TERM_IN_NAME);
    }

    #[test]
    fn make_not_matched_inside_words() {
        let target = item(1, "Frame bracket");
        assert_eq!(score(&target, &parse("ram")), BASELINE);
    }

    #[test]
    fn rank_orders_by_score_then_stock_then_recency() {
        let mut best = item(1, "Ceramic brake pads");
        best.stock_quantity = 0;

        let mut stocked = item(2, "Wiper blades");
        stocked.stock_quantity = 10;

        let mut newer = item(3, "Wiper blades");
        newer.stock_quantity = 2;
        newer.created_at = datetime!(2024-06-01 0:00 UTC);

        let older = {
            let mut older = item(4, "Wiper blades");
            older.stock_quantity = 2;
            older
        };

        let ranked = rank(vec![older, newer, stocked, best], &parse("ceramic"));
        let order: Vec<i64> = ranked.iter().map(|s| s.item.id.as_i64()).collect();

        assert_eq!(order, vec![1, 2, 3, 4]);
    }

    #[test]
    fn score_in_place_keeps_order() {
        let items = vec![item(1, "Wiper blades"), item(2, "Ceramic pads")];

        let scored = score_in_place(items.clone(), Some(&parse("ceramic")));
        assert_eq!(scored[0].item.id, ItemId::new(1));
        assert!(scored[1].relevance_score > scored[0].relevance_score);

        let unscored = score_in_place(items, None);
        assert!(unscored.iter().all(|s| s.relevance_score == 0.0));
    }
}
