//! Vehicle vocabulary shared by the query parser, the compatibility
//! generator and the relevance scorer.
//!
//! Makes are a closed enum; models are canonical lowercase strings spelled
//! the way [`normalize_model`] produces them, so a parsed query and a
//! generated descriptor can be compared with plain equality.

use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Oldest model year the catalog deals with.
pub const MIN_MODEL_YEAR: u16 = 1990;

/// Years later than this many years past the reference year are rejected.
pub const MAX_YEARS_AHEAD: u16 = 2;

/// Whether `year` is a plausible model year relative to `reference_year`.
pub fn is_model_year(year: u16, reference_year: u16) -> bool {
    (MIN_MODEL_YEAR..=reference_year.saturating_add(MAX_YEARS_AHEAD)).contains(&year)
}

/// Vehicle manufacturer.
///
/// `Display` yields the canonical lowercase name; `FromStr` also accepts
/// the common aliases (`chevy`, `vw`, `mercedes`, …).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    SerializeDisplay,
    DeserializeFromStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Make {
    #[strum(to_string = "toyota")]
    Toyota,
    #[strum(to_string = "honda")]
    Honda,
    #[strum(to_string = "ford")]
    Ford,
    #[strum(to_string = "chevrolet", serialize = "chevy")]
    Chevrolet,
    #[strum(to_string = "nissan")]
    Nissan,
    #[strum(to_string = "hyundai")]
    Hyundai,
    #[strum(to_string = "kia")]
    Kia,
    #[strum(to_string = "mazda")]
    Mazda,
    #[strum(to_string = "subaru")]
    Subaru,
    #[strum(to_string = "volkswagen", serialize = "vw")]
    Volkswagen,
    #[strum(to_string = "bmw")]
    Bmw,
    #[strum(to_string = "mercedes-benz", serialize = "mercedes", serialize = "benz")]
    MercedesBenz,
    #[strum(to_string = "audi")]
    Audi,
    #[strum(to_string = "lexus")]
    Lexus,
    #[strum(to_string = "acura")]
    Acura,
    #[strum(to_string = "infiniti")]
    Infiniti,
    #[strum(to_string = "jeep")]
    Jeep,
    #[strum(to_string = "dodge")]
    Dodge,
    #[strum(to_string = "ram")]
    Ram,
    #[strum(to_string = "chrysler")]
    Chrysler,
    #[strum(to_string = "gmc")]
    Gmc,
    #[strum(to_string = "buick")]
    Buick,
    #[strum(to_string = "cadillac")]
    Cadillac,
    #[strum(to_string = "lincoln")]
    Lincoln,
    #[strum(to_string = "volvo")]
    Volvo,
    #[strum(to_string = "mitsubishi")]
    Mitsubishi,
    #[strum(to_string = "tesla")]
    Tesla,
    #[strum(to_string = "porsche")]
    Porsche,
    #[strum(to_string = "land rover", serialize = "land-rover", serialize = "landrover")]
    LandRover,
    #[strum(to_string = "jaguar")]
    Jaguar,
    #[strum(to_string = "alfa romeo", serialize = "alfa-romeo")]
    AlfaRomeo,
}

/// Makes whose name is spelled as more than one word.
const MULTI_WORD_MAKES: &[(&str, Make)] = &[
    ("land rover", Make::LandRover),
    ("alfa romeo", Make::AlfaRomeo),
    ("mercedes benz", Make::MercedesBenz),
];

/// Makes used for the last-resort "fits most vehicles" signal.
pub const POPULAR_MAKES: [Make; 5] = [
    Make::Toyota,
    Make::Honda,
    Make::Ford,
    Make::Chevrolet,
    Make::Nissan,
];

impl Make {
    /// Resolve a single lowercase token (canonical name or alias).
    pub fn from_token(token: &str) -> Option<Self> {
        token.parse().ok()
    }

    /// Find a multi-word make in free text, returning the make and the
    /// words it was spelled with.
    pub fn from_phrase(text: &str) -> Option<(Self, &'static str)> {
        MULTI_WORD_MAKES
            .iter()
            .find(|(phrase, _)| contains_word(text, phrase))
            .map(|(phrase, make)| (*make, *phrase))
    }

    /// Alternative spellings accepted besides the canonical name.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Make::Chevrolet => &["chevy"],
            Make::Volkswagen => &["vw"],
            Make::MercedesBenz => &["mercedes", "benz", "mercedes benz"],
            Make::LandRover => &["land-rover", "landrover"],
            Make::AlfaRomeo => &["alfa-romeo"],
            _ => &[],
        }
    }

    /// Every spelling of this make that may appear in product text.
    pub fn spellings(self) -> Vec<String> {
        std::iter::once(self.to_string())
            .chain(self.aliases().iter().map(|alias| alias.to_string()))
            .collect()
    }

    /// Whether any spelling of this make occurs in `text` as a whole word.
    pub fn mentioned_in(self, text: &str) -> bool {
        self.spellings().iter().any(|s| contains_word(text, s))
    }

    /// Known models in canonical spelling.
    pub fn models(self) -> &'static [&'static str] {
        match self {
            Make::Toyota => &[
                "camry", "corolla", "rav-4", "highlander", "tacoma", "tundra", "prius",
                "sienna", "4runner", "c-hr", "sequoia", "avalon",
            ],
            Make::Honda => &[
                "civic", "accord", "cr-v", "hr-v", "pilot", "odyssey", "ridgeline", "passport",
            ],
            Make::Ford => &[
                "f-150", "f-250", "f-350", "mustang", "explorer", "escape", "focus", "fusion",
                "ranger", "edge", "bronco", "expedition",
            ],
            Make::Chevrolet => &[
                "silverado", "malibu", "equinox", "tahoe", "suburban", "camaro", "corvette",
                "traverse", "colorado", "impala", "cruze",
            ],
            Make::Nissan => &[
                "altima", "sentra", "rogue", "pathfinder", "frontier", "maxima", "murano",
                "titan", "versa",
            ],
            Make::Hyundai => &["elantra", "sonata", "tucson", "santa fe", "kona", "palisade"],
            Make::Kia => &["optima", "sorento", "sportage", "soul", "forte", "telluride"],
            Make::Mazda => &["mazda3", "mazda6", "cx-5", "cx-9", "cx-30", "mx-5"],
            Make::Subaru => &[
                "outback", "forester", "impreza", "crosstrek", "legacy", "ascent", "wrx",
            ],
            Make::Volkswagen => &["jetta", "passat", "golf", "tiguan", "atlas", "beetle"],
            Make::Bmw => &["3 series", "5 series", "x1", "x3", "x5"],
            Make::MercedesBenz => &["c-class", "e-class", "s-class", "glc", "gle"],
            Make::Audi => &["a3", "a4", "a6", "q5", "q7"],
            Make::Lexus => &["rx", "nx", "gx"],
            Make::Acura => &["mdx", "rdx", "tlx", "integra"],
            Make::Infiniti => &["q50", "qx60", "qx80"],
            Make::Jeep => &[
                "wrangler", "grand cherokee", "cherokee", "compass", "renegade", "gladiator",
            ],
            Make::Dodge => &["charger", "challenger", "durango", "journey", "grand caravan"],
            Make::Ram => &["1500", "2500", "3500", "promaster"],
            Make::Chrysler => &["pacifica", "300", "voyager"],
            Make::Gmc => &["sierra", "yukon", "acadia", "terrain", "canyon"],
            Make::Buick => &["enclave", "encore", "envision"],
            Make::Cadillac => &["escalade", "xt5", "ct5"],
            Make::Lincoln => &["navigator", "aviator", "corsair"],
            Make::Volvo => &["xc90", "xc60", "s60"],
            Make::Mitsubishi => &["outlander", "eclipse cross", "mirage"],
            Make::Tesla => &["model 3", "model y", "model s", "model x"],
            Make::Porsche => &["911", "cayenne", "macan"],
            Make::LandRover => &["range rover", "defender", "discovery"],
            Make::Jaguar => &["f-pace", "xf"],
            Make::AlfaRomeo => &["giulia", "stelvio"],
        }
    }

    /// Canonical model name if `model` is one of this make's models.
    pub fn find_model(self, model: &str) -> Option<&'static str> {
        let normalized = normalize_model(model);
        self.models().iter().copied().find(|m| *m == normalized)
    }
}

/// Map shorthand model spellings onto their canonical form.
///
/// Unknown tokens are returned unchanged, so the function is total and
/// idempotent.
pub fn normalize_model(token: &str) -> String {
    let canonical = match token {
        "rav4" => "rav-4",
        "crv" => "cr-v",
        "hrv" => "hr-v",
        "chr" => "c-hr",
        "f150" => "f-150",
        "f250" => "f-250",
        "f350" => "f-350",
        other => {
            return Make::iter()
                .flat_map(|make| make.models().iter().copied())
                .find(|model| model.contains('-') && compact(model) == other)
                .map_or_else(|| other.to_string(), str::to_string)
        }
    };
    canonical.to_string()
}

/// Make owning `model`, searching `preferred` first.
pub fn make_for_model(model: &str, preferred: Option<Make>) -> Option<Make> {
    if let Some(make) = preferred.filter(|make| make.find_model(model).is_some()) {
        return Some(make);
    }
    Make::iter().find(|make| make.find_model(model).is_some())
}

/// Spellings of a canonical model that may appear in product text.
pub fn model_variants(model: &str) -> Vec<String> {
    let compacted = compact(model);
    if compacted == model {
        vec![model.to_string()]
    } else {
        vec![model.to_string(), compacted]
    }
}

/// Whether a model (in any of its spellings) occurs in `text` as a whole word.
pub fn model_mentioned_in(model: &str, text: &str) -> bool {
    model_variants(model)
        .iter()
        .any(|variant| contains_word(text, variant))
}

fn compact(model: &str) -> String {
    model.replace('-', "")
}

/// Whole-word containment: `needle` must not be flanked by alphanumerics.
///
/// Both arguments are expected to be lowercase already.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
