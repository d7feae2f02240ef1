//! Listing page parser
//!
//! Each listing entry lives in a `div.description` container holding the
//! title link, a feature list (year, distance, fuel in fixed positions) and a
//! price block.

use crate::parsing::extract::{compile, ExtractionTable, FieldRule, Pick, Transform};
use crate::parsing::normalize::to_count;
use crate::parsing::SelectorError;
use crate::record::ItemStub;
use scraper::{Html, Selector};
use url::Url;

const CONTAINER: &str = "div.description";
const TITLE_LINK: &str = "a[itemprop='url']";
const FEATURES: &str = "ul.push-bottom li";
const PRICE: &str = "div.price span";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListingField {
    Title,
    Link,
    Year,
    Distance,
    Fuel,
    Price,
}

/// Extracts [`ItemStub`]s from a listing index document
#[derive(Debug, Clone)]
pub struct ListingParser {
    container: Selector,
    fields: ExtractionTable<ListingField>,
}

impl ListingParser {
    pub fn new() -> Result<Self, SelectorError> {
        let fields = ExtractionTable::new(vec![
            FieldRule::new(ListingField::Title, TITLE_LINK, Pick::First, Transform::Text, "N/A")?,
            FieldRule::new(
                ListingField::Link,
                TITLE_LINK,
                Pick::First,
                Transform::Attr("href"),
                "",
            )?,
            FieldRule::new(ListingField::Year, FEATURES, Pick::Nth(0), Transform::Text, "N/A")?,
            FieldRule::new(
                ListingField::Distance,
                FEATURES,
                Pick::Nth(1),
                Transform::Digits,
                "0",
            )?,
            FieldRule::new(ListingField::Fuel, FEATURES, Pick::Nth(2), Transform::Text, "N/A")?,
            FieldRule::new(ListingField::Price, PRICE, Pick::First, Transform::Digits, "0")?,
        ]);

        Ok(Self {
            container: compile(CONTAINER)?,
            fields,
        })
    }

    /// Lazily yields the stubs of `document` in document order
    ///
    /// Entries without a resolvable detail link are dropped here, since they
    /// can never be enriched. Entries with a short or missing feature list
    /// still produce a stub with defaulted fields.
    ///
    /// # Arguments
    ///
    /// * `document` - The parsed listing page
    /// * `page_url` - Address the page was fetched from, for resolving relative links
    pub fn parse<'a>(
        &'a self,
        document: &'a Html,
        page_url: &'a Url,
    ) -> impl Iterator<Item = ItemStub> + 'a {
        document.select(&self.container).filter_map(move |container| {
            let mut values = self.fields.apply(container);

            let href = values.take(ListingField::Link);
            let Some(detail_url) = resolve_link(&href, page_url) else {
                tracing::debug!(
                    "Dropping listing entry without a usable link: {:?}",
                    values.take(ListingField::Title)
                );
                return None;
            };

            Some(ItemStub {
                title: values.take(ListingField::Title),
                detail_url,
                year: values.take(ListingField::Year),
                distance_km: to_count(&values.take(ListingField::Distance)),
                fuel_type: values.take(ListingField::Fuel),
                price_eur: to_count(&values.take(ListingField::Price)),
            })
        })
    }
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None for empty hrefs, fragment-only anchors, special schemes and
/// anything that does not resolve against `base_url`.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url)
    } else {
        None
    }
}
