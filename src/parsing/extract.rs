//! Declarative field extraction
//!
//! A page is described as a table of [`FieldRule`]s, each mapping a semantic
//! field to a selector, a rule for picking one of the matched elements, a
//! transform applied to it, and the default used when nothing matches.
//! Adding a field means adding a row, not new branching logic.

use crate::parsing::normalize::{clean_text, digits_only};
use crate::parsing::SelectorError;
use scraper::{ElementRef, Selector};

/// Which of the elements matched by a selector supplies the value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pick {
    First,

    /// Zero-based position among the matches
    Nth(usize),

    /// First match whose text contains the marker, case-insensitively
    FirstContaining(String),
}

/// How the picked element is turned into a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Whitespace-normalized text content
    Text,

    /// Decimal digits of the text content
    Digits,

    /// Raw value of an attribute
    Attr(&'static str),
}

/// One row of an extraction table
#[derive(Debug, Clone)]
pub struct FieldRule<K> {
    pub field: K,
    selector: Selector,
    pick: Pick,
    transform: Transform,
    default: &'static str,
}

impl<K: Copy + PartialEq> FieldRule<K> {
    pub fn new(
        field: K,
        selector: &str,
        pick: Pick,
        transform: Transform,
        default: &'static str,
    ) -> Result<Self, SelectorError> {
        Ok(Self {
            field,
            selector: compile(selector)?,
            pick,
            transform,
            default,
        })
    }

    /// Value of this field inside `scope`, or the default when absent
    pub fn apply(&self, scope: ElementRef<'_>) -> String {
        self.extract(scope)
            .unwrap_or_else(|| self.default.to_string())
    }

    fn extract(&self, scope: ElementRef<'_>) -> Option<String> {
        let mut matches = scope.select(&self.selector);

        let element = match &self.pick {
            Pick::First => matches.next(),
            Pick::Nth(n) => matches.nth(*n),
            Pick::FirstContaining(marker) => {
                let marker = marker.to_lowercase();
                matches.find(|el| text_of(*el).to_lowercase().contains(&marker))
            }
        }?;

        let value = match self.transform {
            Transform::Text => text_of(element),
            Transform::Digits => digits_only(&text_of(element)),
            Transform::Attr(name) => element.value().attr(name)?.trim().to_string(),
        };

        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Field values produced by one pass of an [`ExtractionTable`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted<K> {
    values: Vec<(K, String)>,
}

impl<K: Copy + PartialEq> Extracted<K> {
    /// Removes and returns the value for `field`; empty if the table has no such row
    pub fn take(&mut self, field: K) -> String {
        match self.values.iter().position(|(k, _)| *k == field) {
            Some(index) => self.values.swap_remove(index).1,
            None => String::new(),
        }
    }
}

/// A small interpreter over a list of [`FieldRule`]s
#[derive(Debug, Clone)]
pub struct ExtractionTable<K> {
    rules: Vec<FieldRule<K>>,
}

impl<K: Copy + PartialEq> ExtractionTable<K> {
    pub fn new(rules: Vec<FieldRule<K>>) -> Self {
        Self { rules }
    }

    /// Runs every rule against `scope`. Never fails: missing fields get their defaults.
    pub fn apply(&self, scope: ElementRef<'_>) -> Extracted<K> {
        Extracted {
            values: self
                .rules
                .iter()
                .map(|rule| (rule.field, rule.apply(scope)))
                .collect(),
        }
    }
}

/// Compiles a CSS selector, keeping the failing source in the error
pub fn compile(selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|e| SelectorError {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}
