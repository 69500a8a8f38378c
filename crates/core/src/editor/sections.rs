//! Site section configuration editors.
//!
//! Each page section stored in `site_settings` has a fixed JSON shape. A
//! submitted value is parsed into that shape (unknown keys rejected),
//! checked, and re-serialized so only the sanitized form is stored.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::{trim, trim_opt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Hero,
    Stats,
    Process,
    Faq,
    Pricing,
    Cta,
}

impl SectionKey {
    pub const ALL: [SectionKey; 6] = [
        SectionKey::Hero,
        SectionKey::Stats,
        SectionKey::Process,
        SectionKey::Faq,
        SectionKey::Pricing,
        SectionKey::Cta,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKey::Hero => "hero",
            SectionKey::Stats => "stats",
            SectionKey::Process => "process",
            SectionKey::Faq => "faq",
            SectionKey::Pricing => "pricing",
            SectionKey::Cta => "cta",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = SectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| SectionError::UnknownSection(s.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum SectionError {
    #[error("unknown section '{0}'")]
    UnknownSection(String),
    #[error("{section} config has the wrong shape: {source}")]
    Shape {
        section: SectionKey,
        #[source]
        source: serde_json::Error,
    },
    #[error("{section} config is invalid: {reason}")]
    Invalid {
        section: SectionKey,
        reason: String,
    },
}

trait SectionShape: DeserializeOwned + Serialize {
    fn check(&mut self) -> Result<(), String>;
}

fn require(field: &str, value: &mut String) -> Result<(), String> {
    trim(value);
    if value.is_empty() {
        Err(format!("{field} is required"))
    } else {
        Ok(())
    }
}

fn require_items<T>(field: &str, items: &[T], max: usize) -> Result<(), String> {
    if items.is_empty() {
        return Err(format!("{field} needs at least one entry"));
    }
    if items.len() > max {
        return Err(format!("{field} allows at most {max} entries"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Link {
    label: String,
    href: String,
}

impl Link {
    fn check(&mut self, field: &str) -> Result<(), String> {
        require(&format!("{field}.label"), &mut self.label)?;
        require(&format!("{field}.href"), &mut self.href)?;
        if !(self.href.starts_with('/') || self.href.starts_with("http") || self.href.starts_with('#')) {
            return Err(format!("{field}.href must be a path, anchor or URL"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Hero {
    headline: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subheadline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    primary_cta: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secondary_cta: Option<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    background_image: Option<String>,
}

impl SectionShape for Hero {
    fn check(&mut self) -> Result<(), String> {
        require("headline", &mut self.headline)?;
        trim_opt(&mut self.subheadline);
        trim_opt(&mut self.background_image);
        if let Some(l) = self.primary_cta.as_mut() {
            l.check("primary_cta")?;
        }
        if let Some(l) = self.secondary_cta.as_mut() {
            l.check("secondary_cta")?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Stat {
    value: String,
    label: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Stats {
    items: Vec<Stat>,
}

impl SectionShape for Stats {
    fn check(&mut self) -> Result<(), String> {
        require_items("items", &self.items, 8)?;
        for s in self.items.iter_mut() {
            require("items.value", &mut s.value)?;
            require("items.label", &mut s.label)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Step {
    title: String,
    description: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Process {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    heading: Option<String>,
    steps: Vec<Step>,
}

impl SectionShape for Process {
    fn check(&mut self) -> Result<(), String> {
        trim_opt(&mut self.heading);
        require_items("steps", &self.steps, 10)?;
        for s in self.steps.iter_mut() {
            require("steps.title", &mut s.title)?;
            require("steps.description", &mut s.description)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Question {
    question: String,
    answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Faq {
    items: Vec<Question>,
}

impl SectionShape for Faq {
    fn check(&mut self) -> Result<(), String> {
        require_items("items", &self.items, 30)?;
        for q in self.items.iter_mut() {
            require("items.question", &mut q.question)?;
            require("items.answer", &mut q.answer)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Plan {
    name: String,
    price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    period: Option<String>,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    highlighted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cta: Option<Link>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Pricing {
    plans: Vec<Plan>,
}

impl SectionShape for Pricing {
    fn check(&mut self) -> Result<(), String> {
        require_items("plans", &self.plans, 6)?;
        for p in self.plans.iter_mut() {
            require("plans.name", &mut p.name)?;
            require("plans.price", &mut p.price)?;
            trim_opt(&mut p.period);
            super::clean_list(&mut p.features);
            if let Some(l) = p.cta.as_mut() {
                l.check("plans.cta")?;
            }
        }
        if self.plans.iter().filter(|p| p.highlighted).count() > 1 {
            return Err("only one plan can be highlighted".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Cta {
    heading: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    button: Link,
}

impl SectionShape for Cta {
    fn check(&mut self) -> Result<(), String> {
        require("heading", &mut self.heading)?;
        trim_opt(&mut self.body);
        self.button.check("button")
    }
}

fn run<S: SectionShape>(section: SectionKey, value: Value) -> Result<Value, SectionError> {
    let mut shape: S =
        serde_json::from_value(value).map_err(|source| SectionError::Shape { section, source })?;
    shape
        .check()
        .map_err(|reason| SectionError::Invalid { section, reason })?;
    serde_json::to_value(shape).map_err(|source| SectionError::Shape { section, source })
}

/// Validate and sanitize a section config value.
pub fn validate_section(section: SectionKey, value: Value) -> Result<Value, SectionError> {
    match section {
        SectionKey::Hero => run::<Hero>(section, value),
        SectionKey::Stats => run::<Stats>(section, value),
        SectionKey::Process => run::<Process>(section, value),
        SectionKey::Faq => run::<Faq>(section, value),
        SectionKey::Pricing => run::<Pricing>(section, value),
        SectionKey::Cta => run::<Cta>(section, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn hero_is_sanitized() {
        let v = validate_section(
            SectionKey::Hero,
            json!({
                "headline": "  We build brands  ",
                "subheadline": "",
                "primary_cta": {"label": "Talk to us", "href": "/contact"}
            }),
        )
        .unwrap();
        assert_eq!(v["headline"], "We build brands");
        assert!(v.get("subheadline").is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = validate_section(SectionKey::Cta, json!({"heading": "x", "button": {"label": "a", "href": "/"}, "color": "red"}))
            .unwrap_err();
        assert_matches!(err, SectionError::Shape { section: SectionKey::Cta, .. });
    }

    #[test]
    fn empty_lists_are_invalid() {
        let err = validate_section(SectionKey::Faq, json!({"items": []})).unwrap_err();
        assert_matches!(err, SectionError::Invalid { section: SectionKey::Faq, .. });
    }

    #[test]
    fn bad_link_is_invalid() {
        let err = validate_section(
            SectionKey::Cta,
            json!({"heading": "Ready?", "button": {"label": "Go", "href": "javascript:alert(1)"}}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("button.href"));
    }

    #[test]
    fn single_highlighted_plan() {
        let plan = |h| json!({"name": "Starter", "price": "$990", "highlighted": h});
        assert!(validate_section(SectionKey::Pricing, json!({"plans": [plan(true), plan(false)]})).is_ok());
        assert!(validate_section(SectionKey::Pricing, json!({"plans": [plan(true), plan(true)]})).is_err());
    }

    #[test]
    fn keys_parse() {
        assert_eq!("faq".parse::<SectionKey>().unwrap(), SectionKey::Faq);
        assert_matches!("footer".parse::<SectionKey>(), Err(SectionError::UnknownSection(_)));
    }
}
