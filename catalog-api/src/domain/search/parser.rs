//! Query parser for shopper search text.
//!
//! Transforms queries like "2016 toyota rav4 brake pads" into a vehicle
//! (year/make/model), part numbers and generic product terms.

use regex::Regex;
use std::sync::LazyLock;

use super::types::{ParsedQuery, SearchType, VehicleInfo};
use super::vehicle::{is_model_year, make_for_model, normalize_model, Make};
use crate::domain::clock::Clock;

/// Terms that name a kind of part rather than a vehicle or a part number.
pub const AUTO_PART_TERMS: &[&str] = &[
    "brake", "brakes", "pad", "pads", "rotor", "rotors", "caliper", "calipers", "filter",
    "filters", "oil", "air", "cabin", "fuel", "spark", "plug", "plugs", "battery", "alternator",
    "starter", "headlight", "headlights", "taillight", "taillights", "light", "lights", "bulb",
    "bulbs", "wiper", "wipers", "blade", "blades", "belt", "belts", "timing", "serpentine",
    "shock", "shocks", "strut", "struts", "absorber", "absorbers", "radiator", "coolant",
    "thermostat", "water", "pump", "injector", "sensor", "oxygen", "muffler", "exhaust",
    "catalytic", "converter", "mirror", "bumper", "grille", "hood", "fender", "tire", "tires",
    "wheel", "wheels", "bearing", "hub", "axle", "cv", "joint", "clutch", "transmission",
    "gasket", "hose", "fluid", "fuse", "relay", "mat", "mats", "floor", "cover", "covers",
    "seat", "kit", "assembly", "part", "parts", "accessory", "accessories",
];

/// Filler words dropped before classification.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "the", "for", "of", "in", "on", "to", "with", "or", "my", "by", "from",
    "fits", "compatible", "replacement", "vehicle", "car", "auto", "new", "best", "cheap",
];

// Regex patterns compiled once
static PART_NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]{3,}$").unwrap());

pub fn is_auto_part_term(token: &str) -> bool {
    AUTO_PART_TERMS.contains(&token)
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Whether a token looks like a manufacturer part number or SKU.
///
/// The character pattern alone also matches ordinary words, so at least
/// one digit is required.
pub fn has_part_number_shape(token: &str) -> bool {
    PART_NUMBER_PATTERN.is_match(token) && token.bytes().any(|b| b.is_ascii_digit())
}

/// Lowercase, trim, strip surrounding punctuation from each word and
/// collapse whitespace.
///
/// The result is a fixed point: normalizing it again changes nothing.
pub fn normalize_query(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric() && c != '-'))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parser for shopper queries.
///
/// Holds the reference year that bounds which numbers count as model years.
#[derive(Debug, Clone, Copy)]
pub struct QueryParser {
    reference_year: u16,
}

impl QueryParser {
    pub fn new(reference_year: u16) -> Self {
        Self { reference_year }
    }

    pub fn from_clock(clock: &dyn Clock) -> Self {
        Self::new(clock.current_year())
    }

    /// Parse a raw query. Never fails: empty or unusable input yields
    /// [`ParsedQuery::empty`].
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let parsed = QueryParser::new(2025).parse("2016 toyota rav4");
    /// assert_eq!(parsed.vehicle_info.year, Some(2016));
    /// assert_eq!(parsed.vehicle_info.model.as_deref(), Some("rav-4"));
    /// assert_eq!(parsed.search_type, SearchType::VehicleCompatibility);
    /// ```
    pub fn parse(&self, raw: &str) -> ParsedQuery {
        let normalized = normalize_query(raw);
        if normalized.is_empty() {
            return ParsedQuery::empty(raw);
        }

        let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
        let mut vehicle_info = VehicleInfo {
            year: self.extract_year(&mut tokens),
            ..Default::default()
        };
        vehicle_info.make = extract_make(&normalized, &mut tokens);

        let has_context = vehicle_info.year.is_some() || vehicle_info.make.is_some();
        vehicle_info.model = extract_model(&mut tokens, vehicle_info.make, has_context);

        let (product_terms, part_numbers) = classify_remaining(&tokens);

        let has_vehicle_info = !vehicle_info.is_empty();
        let has_part_number = !part_numbers.is_empty();
        let search_type = search_type_for(has_part_number, has_vehicle_info, &product_terms);

        ParsedQuery {
            vehicle_info,
            product_terms,
            part_numbers,
            original_query: raw.to_string(),
            has_vehicle_info,
            has_part_number,
            search_type,
        }
    }

    /// Parse a token as a model year within the accepted range.
    pub fn parse_year(&self, token: &str) -> Option<u16> {
        if !is_numeric(token) {
            return None;
        }
        token
            .parse::<u16>()
            .ok()
            .filter(|year| is_model_year(*year, self.reference_year))
    }

    fn extract_year(&self, tokens: &mut Vec<&str>) -> Option<u16> {
        let (pos, year) = tokens
            .iter()
            .enumerate()
            .find_map(|(i, token)| self.parse_year(token).map(|year| (i, year)))?;
        tokens.remove(pos);
        Some(year)
    }
}

fn extract_make(normalized: &str, tokens: &mut Vec<&str>) -> Option<Make> {
    // Multi-word makes first, so "mercedes benz" does not leave "benz" behind
    if let Some((make, phrase)) = Make::from_phrase(normalized) {
        let words: Vec<&str> = phrase.split(' ').collect();
        if let Some(start) = tokens.windows(words.len()).position(|w| w == words.as_slice()) {
            tokens.drain(start..start + words.len());
        }
        return Some(make);
    }

    let pos = tokens.iter().position(|t| Make::from_token(t).is_some())?;
    Make::from_token(tokens.remove(pos))
}

/// Pick the model token.
///
/// A known model wins over anything else; otherwise, only when a year or
/// make gives vehicle context, the first candidate without part-number
/// shape is taken.
fn extract_model(tokens: &mut Vec<&str>, make: Option<Make>, has_context: bool) -> Option<String> {
    let candidates: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| !is_auto_part_term(t) && !is_stopword(t))
        .filter(|(_, t)| {
            // Numeric models (ram 1500) only count next to their make
            !is_numeric(t) || make.is_some_and(|m| m.find_model(t).is_some())
        })
        .map(|(i, _)| i)
        .collect();

    let known = candidates
        .iter()
        .copied()
        .find(|&i| is_known_model(tokens[i], make));

    let pos = known.or_else(|| {
        has_context
            .then(|| {
                candidates
                    .iter()
                    .copied()
                    .find(|&i| !has_part_number_shape(tokens[i]))
            })
            .flatten()
    })?;

    Some(normalize_model(tokens.remove(pos)))
}

fn is_known_model(token: &str, make: Option<Make>) -> bool {
    match make {
        Some(make) => make.find_model(token).is_some(),
        None => make_for_model(token, None).is_some(),
    }
}

fn classify_remaining(tokens: &[&str]) -> (Vec<String>, Vec<String>) {
    let mut product_terms: Vec<String> = Vec::new();
    let mut part_numbers: Vec<String> = Vec::new();

    for &token in tokens {
        if is_stopword(token) {
            continue;
        }
        let bucket = if is_auto_part_term(token) {
            &mut product_terms
        } else if has_part_number_shape(token) {
            &mut part_numbers
        } else if token.chars().count() > 1 {
            &mut product_terms
        } else {
            continue;
        };
        if !bucket.iter().any(|existing| existing == token) {
            bucket.push(token.to_string());
        }
    }

    (product_terms, part_numbers)
}

fn search_type_for(
    has_part_number: bool,
    has_vehicle_info: bool,
    product_terms: &[String],
) -> SearchType {
    if has_part_number {
        SearchType::PartNumber
    } else if has_vehicle_info && !product_terms.is_empty() {
        SearchType::VehicleWithProduct
    } else if has_vehicle_info {
        SearchType::VehicleCompatibility
    } else if !product_terms.is_empty() {
        SearchType::ProductName
    } else {
        SearchType::General
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> ParsedQuery {
        QueryParser::new(2025).parse(query)
    }

    #[test]
    fn parse_empty_query() {
        let parsed = parse("");
        assert_eq!(parsed, ParsedQuery::empty(""));
        assert_eq!(parsed.search_type, SearchType::General);

        let parsed = parse("   ");
        assert!(parsed.is_unstructured());
        assert_eq!(parsed.search_type, SearchType::General);
    }

    #[test]
    fn parse_garbage_degenerates_to_general() {
        let parsed = parse("?? !! x");
        assert!(parsed.is_unstructured());
        assert_eq!(parsed.search_type, SearchType::General);
    }

    #[test]
    fn parse_year_make_model() {
        let parsed = parse("2016 toyota rav4");
        assert_eq!(parsed.vehicle_info.year, Some(2016));
        assert_eq!(parsed.vehicle_info.make, Some(Make::Toyota));
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("rav-4"));
        assert!(parsed.has_vehicle_info);
        assert!(!parsed.has_part_number);
        assert_eq!(parsed.search_type, SearchType::VehicleCompatibility);
    }

    #[test]
    fn parse_vehicle_with_product() {
        let parsed = parse("2016 Toyota RAV4 brake pads");
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("rav-4"));
        assert_eq!(parsed.product_terms, vec!["brake", "pads"]);
        assert!(parsed.part_numbers.is_empty());
        assert_eq!(parsed.search_type, SearchType::VehicleWithProduct);
        assert_eq!(parsed.original_query, "2016 Toyota RAV4 brake pads");
    }

    #[test]
    fn parse_part_number() {
        let parsed = parse("ABC-1234");
        assert_eq!(parsed.part_numbers, vec!["abc-1234"]);
        assert!(parsed.has_part_number);
        assert!(!parsed.has_vehicle_info);
        assert_eq!(parsed.search_type, SearchType::PartNumber);
    }

    #[test]
    fn part_number_wins_over_vehicle() {
        let parsed = parse("toyota 04465-33450 pads");
        assert_eq!(parsed.vehicle_info.make, Some(Make::Toyota));
        assert_eq!(parsed.vehicle_info.model, None);
        assert_eq!(parsed.part_numbers, vec!["04465-33450"]);
        assert_eq!(parsed.search_type, SearchType::PartNumber);
    }

    #[test]
    fn known_model_beats_part_number_shape() {
        // f150 has part-number shape but is a known Ford model
        let parsed = parse("ford f150 tail light");
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("f-150"));
        assert!(parsed.part_numbers.is_empty());
    }

    #[test]
    fn known_model_preferred_over_earlier_unknown_token() {
        let parsed = parse("honda genuine civic wipers");
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("civic"));
        assert_eq!(parsed.product_terms, vec!["genuine", "wipers"]);
    }

    #[test]
    fn unknown_model_taken_with_vehicle_context() {
        let parsed = parse("2004 honda element mirror");
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("element"));
        assert_eq!(parsed.product_terms, vec!["mirror"]);
    }

    #[test]
    fn no_model_without_context() {
        let parsed = parse("chrome trim");
        assert_eq!(parsed.vehicle_info.model, None);
        assert_eq!(parsed.product_terms, vec!["chrome", "trim"]);
        assert_eq!(parsed.search_type, SearchType::ProductName);
    }

    #[test]
    fn model_alone_is_vehicle_info() {
        let parsed = parse("rav4 floor mats");
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("rav-4"));
        assert_eq!(parsed.vehicle_info.make, None);
        assert_eq!(parsed.search_type, SearchType::VehicleWithProduct);
    }

    #[test]
    fn parse_make_aliases() {
        assert_eq!(parse("chevy silverado").vehicle_info.make, Some(Make::Chevrolet));
        assert_eq!(parse("vw jetta").vehicle_info.make, Some(Make::Volkswagen));
        assert_eq!(parse("mercedes c-class").vehicle_info.make, Some(Make::MercedesBenz));
    }

    #[test]
    fn parse_multi_word_make() {
        let parsed = parse("2018 land rover defender floor mats");
        assert_eq!(parsed.vehicle_info.make, Some(Make::LandRover));
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("defender"));
        assert_eq!(parsed.product_terms, vec!["floor", "mats"]);

        let parsed = parse("mercedes benz gle cabin filter");
        assert_eq!(parsed.vehicle_info.make, Some(Make::MercedesBenz));
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("gle"));
    }

    #[test]
    fn numeric_model_kept_next_to_its_make() {
        let parsed = parse("ram 1500 mud flaps");
        assert_eq!(parsed.vehicle_info.make, Some(Make::Ram));
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("1500"));
        assert!(parsed.part_numbers.is_empty());
    }

    #[test]
    fn year_outside_bounds_is_not_a_year() {
        let parsed = parse("1985 mustang");
        assert_eq!(parsed.vehicle_info.year, None);
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("mustang"));
        assert_eq!(parsed.part_numbers, vec!["1985"]);

        assert_eq!(parse("2027 civic").vehicle_info.year, Some(2027));
        assert_eq!(parse("2028 civic").vehicle_info.year, None);
    }

    #[test]
    fn only_first_year_extracted() {
        let parsed = parse("2015 2016 camry");
        assert_eq!(parsed.vehicle_info.year, Some(2015));
        assert_eq!(parsed.part_numbers, vec!["2016"]);
    }

    #[test]
    fn stopwords_and_single_chars_dropped() {
        let parsed = parse("pads for the a civic");
        assert_eq!(parsed.product_terms, vec!["pads"]);
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("civic"));
    }

    #[test]
    fn punctuation_is_stripped() {
        let parsed = parse("Brake pads, (2019) Honda Civic!");
        assert_eq!(parsed.vehicle_info.year, Some(2019));
        assert_eq!(parsed.vehicle_info.make, Some(Make::Honda));
        assert_eq!(parsed.vehicle_info.model.as_deref(), Some("civic"));
        assert_eq!(parsed.product_terms, vec!["brake", "pads"]);
    }

    #[test]
    fn parsing_normalized_query_is_idempotent() {
        let queries = [
            "2016 Toyota RAV4 brake pads",
            "ABC-1234",
            "chevy  silverado 1500   headlights",
            "",
            "mercedes benz gle",
            "oil filter, 5 pack",
        ];
        for query in queries {
            let once = normalize_query(query);
            let twice = normalize_query(&once);
            assert_eq!(once, twice);
            assert_eq!(parse(&once), parse(&twice), "query: {query}");
        }
    }

    #[test]
    fn parser_from_clock_uses_current_year() {
        let clock = crate::domain::clock::ManualClock::at_year(2010);
        let parser = QueryParser::from_clock(&clock);
        assert_eq!(parser.parse_year("2012"), Some(2012));
        assert_eq!(parser.parse_year("2013"), None);
    }
}
