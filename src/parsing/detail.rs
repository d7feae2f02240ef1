//! Detail page parser

use crate::parsing::extract::{ExtractionTable, FieldRule, Pick, Transform};
use crate::parsing::normalize::to_count;
use crate::parsing::SelectorError;
use crate::record::{DetailFields, UNKNOWN};
use scraper::Html;

const REGION: &str = ".trader .region";
const COUNTRY: &str = ".trader .country";
const DISPLACEMENT: &str = ".characteristics .cylinder-capacity .value";
const GEARBOX: &str = ".characteristics .gearbox .value";
const SEGMENT: &str = ".characteristics .body-type .value";
const RESUME_ENTRIES: &str = ".vehicle-resume li";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailField {
    Region,
    Country,
    Displacement,
    Gearbox,
    Segment,
    Power,
}

/// Extracts [`DetailFields`] from an item's detail document
#[derive(Debug, Clone)]
pub struct DetailParser {
    fields: ExtractionTable<DetailField>,
}

impl DetailParser {
    /// Builds the parser
    ///
    /// # Arguments
    ///
    /// * `power_marker` - Substring (matched case-insensitively) that marks the
    ///   horsepower entry of the vehicle resume list, e.g. "cv"
    pub fn new(power_marker: &str) -> Result<Self, SelectorError> {
        let fields = ExtractionTable::new(vec![
            FieldRule::new(DetailField::Region, REGION, Pick::First, Transform::Text, "")?,
            FieldRule::new(DetailField::Country, COUNTRY, Pick::First, Transform::Text, "")?,
            FieldRule::new(
                DetailField::Displacement,
                DISPLACEMENT,
                Pick::First,
                Transform::Digits,
                "0",
            )?,
            FieldRule::new(DetailField::Gearbox, GEARBOX, Pick::First, Transform::Text, UNKNOWN)?,
            FieldRule::new(DetailField::Segment, SEGMENT, Pick::First, Transform::Text, UNKNOWN)?,
            FieldRule::new(
                DetailField::Power,
                RESUME_ENTRIES,
                Pick::FirstContaining(power_marker.to_string()),
                Transform::Digits,
                "0",
            )?,
        ]);

        Ok(Self { fields })
    }

    /// Parses a detail page. Total: every missing element yields its default.
    pub fn parse(&self, document: &Html) -> DetailFields {
        let mut values = self.fields.apply(document.root_element());

        let location = compose_location(
            &values.take(DetailField::Country),
            &values.take(DetailField::Region),
        );

        DetailFields {
            location,
            displacement_cc: to_count(&values.take(DetailField::Displacement)),
            gearbox: values.take(DetailField::Gearbox),
            segment: values.take(DetailField::Segment),
            power: to_count(&values.take(DetailField::Power)),
        }
    }
}

/// "country, region", whichever part is present, else "unknown"
fn compose_location(country: &str, region: &str) -> String {
    match (country.is_empty(), region.is_empty()) {
        (false, false) => format!("{}, {}", country, region),
        (false, true) => country.to_string(),
        (true, false) => region.to_string(),
        (true, true) => UNKNOWN.to_string(),
    }
}
