use cascara_core::error::AppError;
use cascara_core::job::{ExtractionRule, SelectorType};
use cascara_core::traits::{FieldExtractor, FieldSet};
use scraper::{Html, Selector};

/// CSS-selector field extractor backed by the `scraper` crate.
///
/// XPath rules are accepted by the data model for import compatibility
/// but are not evaluated here; hitting one is an extraction error
/// rather than a silent miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssFieldExtractor;

impl CssFieldExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_rule(
        document: &Html,
        rule: &ExtractionRule,
    ) -> Result<serde_json::Value, AppError> {
        let selector = Selector::parse(&rule.selector).map_err(|e| {
            AppError::ExtractionError(format!(
                "invalid CSS selector '{}' for field '{}': {e}",
                rule.selector, rule.name
            ))
        })?;

        let mut values = Vec::new();
        for element in document.select(&selector) {
            let value = match &rule.attribute {
                Some(attr) => element.value().attr(attr).map(str::to_string),
                None => {
                    let text = element.text().collect::<Vec<_>>().join(" ");
                    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                    if text.is_empty() { None } else { Some(text) }
                }
            };
            if let Some(value) = value {
                values.push(serde_json::Value::String(value));
            }
            if !rule.is_list && !values.is_empty() {
                break;
            }
        }

        Ok(if rule.is_list {
            serde_json::Value::Array(values)
        } else {
            values.into_iter().next().unwrap_or(serde_json::Value::Null)
        })
    }

    fn is_empty(value: &serde_json::Value) -> bool {
        match value {
            serde_json::Value::Null => true,
            serde_json::Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl FieldExtractor for CssFieldExtractor {
    fn extract(&self, document: &str, rules: &[ExtractionRule]) -> Result<FieldSet, AppError> {
        let parsed = Html::parse_document(document);

        let mut data = serde_json::Map::with_capacity(rules.len());
        let mut missing = Vec::new();

        for rule in rules {
            if rule.selector_type == SelectorType::XPath {
                return Err(AppError::ExtractionError(format!(
                    "XPath selectors are not supported (field '{}')",
                    rule.name
                )));
            }
            let value = Self::extract_rule(&parsed, rule)?;
            if rule.is_required && Self::is_empty(&value) {
                missing.push(rule.name.clone());
            }
            data.insert(rule.name.clone(), value);
        }

        Ok(FieldSet {
            data: serde_json::Value::Object(data),
            required_satisfied: missing.is_empty(),
            missing,
        })
    }
}
