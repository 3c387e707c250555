// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::error::{Result, SearchError};
use crate::models::facets::FacetSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Version of the `SearchResult` contract returned to callers
pub const RESULT_SCHEMA_VERSION: u32 = 1;

/// Default number of hits per page
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound of the healthiness score scale
pub const MAX_HEALTHINESS: u32 = 100;

/// Dietary flags stored on every recipe as `is_<flag>` booleans
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DietaryFlag {
    Vegan,
    Vegetarian,
    GlutenFree,
    DairyFree,
    NutFree,
}

impl DietaryFlag {
    pub const ALL: [DietaryFlag; 5] = [
        DietaryFlag::Vegan,
        DietaryFlag::Vegetarian,
        DietaryFlag::GlutenFree,
        DietaryFlag::DairyFree,
        DietaryFlag::NutFree,
    ];

    /// Stored document field
    pub fn field(&self) -> &'static str {
        match self {
            DietaryFlag::Vegan => "is_vegan",
            DietaryFlag::Vegetarian => "is_vegetarian",
            DietaryFlag::GlutenFree => "is_gluten_free",
            DietaryFlag::DairyFree => "is_dairy_free",
            DietaryFlag::NutFree => "is_nut_free",
        }
    }

    /// Facet bucket label for documents carrying the flag
    pub fn label(&self) -> &'static str {
        match self {
            DietaryFlag::Vegan => "vegan",
            DietaryFlag::Vegetarian => "vegetarian",
            DietaryFlag::GlutenFree => "gluten_free",
            DietaryFlag::DairyFree => "dairy_free",
            DietaryFlag::NutFree => "nut_free",
        }
    }

    /// Facet bucket label for documents explicitly lacking the flag
    pub fn negated_label(&self) -> &'static str {
        match self {
            DietaryFlag::Vegan => "non_vegan",
            DietaryFlag::Vegetarian => "non_vegetarian",
            DietaryFlag::GlutenFree => "non_gluten_free",
            DietaryFlag::DairyFree => "non_dairy_free",
            DietaryFlag::NutFree => "non_nut_free",
        }
    }
}

/// Recipe difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// What a dietary flag explicitly set to `false` means
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FalseFlagPolicy {
    /// `false` is the same as not mentioning the flag
    #[default]
    Ignore,
    /// `false` keeps only documents whose flag is stored as `false`
    Exclude,
}

/// Edit-distance tolerance for free-text terms.
///
/// `Auto { low, high }` allows no edits for terms shorter than `low` characters, one edit below
/// `high`, and two edits from `high` on. Serialized the way the engine expects it: `"AUTO"`,
/// `"AUTO:4,7"` or an explicit edit count `"0"`..`"2"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FuzzinessRepr", into = "String")]
pub enum Fuzziness {
    Auto { low: u8, high: u8 },
    Edits(u8),
}

impl Fuzziness {
    pub const AUTO_LOW: u8 = 3;
    pub const AUTO_HIGH: u8 = 6;
    pub const MAX_EDITS: u8 = 2;

    /// Edits allowed for a term of `term_len` characters
    pub fn max_edits(&self, term_len: usize) -> u8 {
        match *self {
            Fuzziness::Auto { low, high } => {
                if term_len < low as usize {
                    0
                } else if term_len < high as usize {
                    1
                } else {
                    2
                }
            }
            Fuzziness::Edits(edits) => edits,
        }
    }
}

impl Default for Fuzziness {
    fn default() -> Self {
        Fuzziness::Auto {
            low: Self::AUTO_LOW,
            high: Self::AUTO_HIGH,
        }
    }
}

impl fmt::Display for Fuzziness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Fuzziness::Auto { low, high } if low == Self::AUTO_LOW && high == Self::AUTO_HIGH => {
                write!(f, "AUTO")
            }
            Fuzziness::Auto { low, high } => write!(f, "AUTO:{},{}", low, high),
            Fuzziness::Edits(edits) => write!(f, "{}", edits),
        }
    }
}

impl FromStr for Fuzziness {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SearchError::Validation(format!("Invalid fuzziness '{}'", s));
        let value = s.trim();

        if value.eq_ignore_ascii_case("auto") {
            return Ok(Fuzziness::default());
        }

        if let Some(thresholds) = value
            .strip_prefix("AUTO:")
            .or_else(|| value.strip_prefix("auto:"))
        {
            let (low, high) = thresholds.split_once(',').ok_or_else(invalid)?;
            let low: u8 = low.trim().parse().map_err(|_| invalid())?;
            let high: u8 = high.trim().parse().map_err(|_| invalid())?;
            if low > high {
                return Err(invalid());
            }
            return Ok(Fuzziness::Auto { low, high });
        }

        let edits: u8 = value.parse().map_err(|_| invalid())?;
        if edits > Self::MAX_EDITS {
            return Err(invalid());
        }
        Ok(Fuzziness::Edits(edits))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FuzzinessRepr {
    Number(u8),
    Text(String),
}

impl TryFrom<FuzzinessRepr> for Fuzziness {
    type Error = SearchError;

    fn try_from(repr: FuzzinessRepr) -> Result<Self> {
        match repr {
            FuzzinessRepr::Number(edits) => edits.to_string().parse(),
            FuzzinessRepr::Text(text) => text.parse(),
        }
    }
}

impl From<Fuzziness> for String {
    fn from(fuzziness: Fuzziness) -> Self {
        fuzziness.to_string()
    }
}

/// Numeric document fields a request can bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeField {
    PrepTime,
    CookTime,
    Healthiness,
}

impl RangeField {
    pub fn field(&self) -> &'static str {
        match self {
            RangeField::PrepTime => "est_prep_time_min",
            RangeField::CookTime => "est_cook_time_min",
            RangeField::Healthiness => "healthiness_score",
        }
    }

    fn request_name(&self) -> &'static str {
        match self {
            RangeField::PrepTime => "prep_time",
            RangeField::CookTime => "cook_time",
            RangeField::Healthiness => "healthiness",
        }
    }
}

/// Inclusive bounds on one numeric field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub field: RangeField,
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl Bounds {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Both ends present must satisfy `min <= max`; equal ends are an exact match
    pub fn check(&self) -> Result<()> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min > max => Err(SearchError::Validation(format!(
                "min_{name} ({min}) must not exceed max_{name} ({max})",
                name = self.field.request_name(),
            ))),
            _ => Ok(()),
        }
    }
}

/// Request to search recipes. Every field is optional; an empty request matches everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchRequest {
    /// Free text matched against title, description, ingredients and directions
    #[serde(default)]
    pub query: String,
    /// Fuzzy matching level: "AUTO", "AUTO:<low>,<high>", 0, 1 or 2
    #[serde(default)]
    #[schema(value_type = String, example = "AUTO")]
    pub fuzziness: Fuzziness,
    /// Match any of these cuisines
    #[serde(default)]
    pub cuisines: Vec<String>,
    /// Dietary constraints, e.g. `{"vegan": true}`
    #[serde(default)]
    pub dietary: BTreeMap<DietaryFlag, bool>,
    #[serde(default)]
    pub false_flag_policy: FalseFlagPolicy,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub min_prep_time: Option<u32>,
    #[serde(default)]
    pub max_prep_time: Option<u32>,
    #[serde(default)]
    pub min_cook_time: Option<u32>,
    #[serde(default)]
    pub max_cook_time: Option<u32>,
    #[serde(default)]
    pub min_healthiness: Option<u32>,
    #[serde(default)]
    pub max_healthiness: Option<u32>,
    /// Number of hits to return; 0 returns aggregations only
    #[serde(default = "default_page_size")]
    pub size: u32,
    /// Offset of the first hit (0-based)
    #[serde(default)]
    pub from: u32,
    #[serde(default)]
    pub include_aggregations: bool,
    /// Facets to compute; empty means every registered facet
    #[serde(default)]
    pub facets: Vec<String>,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            fuzziness: Fuzziness::default(),
            cuisines: Vec::new(),
            dietary: BTreeMap::new(),
            false_flag_policy: FalseFlagPolicy::default(),
            difficulty: None,
            min_prep_time: None,
            max_prep_time: None,
            min_cook_time: None,
            max_cook_time: None,
            min_healthiness: None,
            max_healthiness: None,
            size: DEFAULT_PAGE_SIZE,
            from: 0,
            include_aggregations: false,
            facets: Vec::new(),
        }
    }
}

impl SearchRequest {
    /// Text-only request with default paging
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn bounds(&self) -> [Bounds; 3] {
        [
            Bounds {
                field: RangeField::PrepTime,
                min: self.min_prep_time,
                max: self.max_prep_time,
            },
            Bounds {
                field: RangeField::CookTime,
                min: self.min_cook_time,
                max: self.max_cook_time,
            },
            Bounds {
                field: RangeField::Healthiness,
                min: self.min_healthiness,
                max: self.max_healthiness,
            },
        ]
    }

    /// Reject malformed requests before anything is compiled or sent to the engine
    pub fn validate(&self, max_page_size: u32) -> Result<()> {
        if self.size > max_page_size {
            return Err(SearchError::Validation(format!(
                "size ({}) must not exceed {}",
                self.size, max_page_size
            )));
        }

        for value in [self.min_healthiness, self.max_healthiness]
            .into_iter()
            .flatten()
        {
            if value > MAX_HEALTHINESS {
                return Err(SearchError::Validation(format!(
                    "healthiness bounds must be within 0-{}, got {}",
                    MAX_HEALTHINESS, value
                )));
            }
        }

        self.bounds().iter().try_for_each(Bounds::check)
    }
}

/// Dietary flags of one recipe; a flag missing from the document reads as `false`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DietaryProfile {
    pub vegan: bool,
    pub vegetarian: bool,
    pub gluten_free: bool,
    pub dairy_free: bool,
    pub nut_free: bool,
}

impl DietaryProfile {
    pub fn set(&mut self, flag: DietaryFlag, value: bool) {
        match flag {
            DietaryFlag::Vegan => self.vegan = value,
            DietaryFlag::Vegetarian => self.vegetarian = value,
            DietaryFlag::GlutenFree => self.gluten_free = value,
            DietaryFlag::DairyFree => self.dairy_free = value,
            DietaryFlag::NutFree => self.nut_free = value,
        }
    }
}

/// Flattened projection of a stored recipe. Every key is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecipeSummary {
    pub id: String,
    pub score: Option<f64>,
    pub title: String,
    pub description: String,
    pub cuisines: Vec<String>,
    pub difficulty: Option<String>,
    pub prep_time_min: Option<u32>,
    pub cook_time_min: Option<u32>,
    /// Prep plus cook time, missing parts counted as zero
    pub total_time_min: u32,
    pub dietary: DietaryProfile,
    pub healthiness_score: Option<u32>,
    pub ingredients: Vec<String>,
    pub directions: Vec<String>,
}

/// Search response returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    pub schema_version: u32,
    /// Total number of matching recipes
    pub total: u64,
    pub recipes: Vec<RecipeSummary>,
    /// Present only when aggregations were requested
    pub facets: Option<FacetSummary>,
    /// Time the engine reports spending on the query
    pub took_ms: u64,
    /// Wall-clock time spent waiting on the engine call
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_request_is_valid() {
        let request = SearchRequest::default();
        assert!(request.validate(100).is_ok());
        assert_eq!(request.size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_min_above_max_rejected() {
        let request = SearchRequest {
            min_prep_time: Some(40),
            max_prep_time: Some(30),
            ..SearchRequest::default()
        };
        let err = request.validate(100).unwrap_err();
        assert_eq!(
            err,
            SearchError::Validation("min_prep_time (40) must not exceed max_prep_time (30)".into())
        );
    }

    #[test]
    fn test_equal_bounds_are_valid() {
        let request = SearchRequest {
            min_cook_time: Some(20),
            max_cook_time: Some(20),
            ..SearchRequest::default()
        };
        assert!(request.validate(100).is_ok());
    }

    #[test]
    fn test_page_size_and_healthiness_limits() {
        let too_big = SearchRequest {
            size: 101,
            ..SearchRequest::default()
        };
        assert!(too_big.validate(100).is_err());

        let off_scale = SearchRequest {
            max_healthiness: Some(120),
            ..SearchRequest::default()
        };
        assert!(off_scale.validate(100).is_err());
    }

    #[test]
    fn test_fuzziness_auto_thresholds() {
        let auto = Fuzziness::default();
        assert_eq!(auto.max_edits(2), 0);
        assert_eq!(auto.max_edits(3), 1);
        assert_eq!(auto.max_edits(5), 1);
        assert_eq!(auto.max_edits(6), 2);
        assert_eq!(Fuzziness::Edits(1).max_edits(12), 1);
    }

    #[test]
    fn test_fuzziness_parsing() {
        assert_eq!("AUTO".parse::<Fuzziness>().unwrap(), Fuzziness::default());
        assert_eq!(
            "AUTO:4,8".parse::<Fuzziness>().unwrap(),
            Fuzziness::Auto { low: 4, high: 8 }
        );
        assert_eq!("1".parse::<Fuzziness>().unwrap(), Fuzziness::Edits(1));
        assert!("3".parse::<Fuzziness>().is_err());
        assert!("AUTO:8,4".parse::<Fuzziness>().is_err());
        assert!("fuzzy".parse::<Fuzziness>().is_err());
    }

    #[test]
    fn test_fuzziness_serde_accepts_numbers_and_strings() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"query": "pasta", "fuzziness": 0}"#).unwrap();
        assert_eq!(request.fuzziness, Fuzziness::Edits(0));

        let request: SearchRequest =
            serde_json::from_str(r#"{"query": "pasta", "fuzziness": "AUTO:2,5"}"#).unwrap();
        assert_eq!(request.fuzziness, Fuzziness::Auto { low: 2, high: 5 });
        assert_eq!(
            serde_json::to_value(request.fuzziness).unwrap(),
            serde_json::json!("AUTO:2,5")
        );
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: SearchRequest = serde_json::from_str(
            r#"{"cuisines": ["italian"], "dietary": {"vegan": true}, "from": 20}"#,
        )
        .unwrap();
        assert_eq!(request.query, "");
        assert_eq!(request.from, 20);
        assert_eq!(request.size, DEFAULT_PAGE_SIZE);
        assert_eq!(request.dietary.get(&DietaryFlag::Vegan), Some(&true));
        assert_eq!(request.false_flag_policy, FalseFlagPolicy::Ignore);
    }
}
