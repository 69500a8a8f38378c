//! Editor payload validation.
//!
//! An editor submit arrives as a JSON object. It is deserialized into the
//! collection's form type, sanitized (trimmed, empty optionals dropped,
//! lists de-duplicated, slug derived), validated, and turned into an
//! [`EditorDraft`] carrying a status that is legal for the collection.

pub mod forms;
pub mod sections;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use validator::Validate;

use crate::content::{Collection, Status, StatusError};

pub use forms::{CaseStudyForm, LeadForm, PostForm, ServiceForm, TestimonialForm};
pub use sections::{validate_section, SectionError, SectionKey};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("payload does not match the {collection} form: {source}")]
    Malformed {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(#[from] validator::ValidationErrors),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error("items are archived with the archive action, not from the editor")]
    ArchiveFromEditor,
}

/// Sanitized, validated payload ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorDraft {
    pub status: Status,
    pub fields: Map<String, Value>,
}

/// Behaviour shared by the per-collection forms.
pub trait EditorForm: DeserializeOwned + Serialize + Validate {
    const COLLECTION: Collection;

    /// Trim and normalise in place before validation.
    fn sanitize(&mut self);

    /// Raw status picked in the editor, if any.
    fn status(&self) -> Option<&str>;
}

/// Build a draft from a raw payload for `F`'s collection.
pub fn build<F: EditorForm>(payload: Value) -> Result<EditorDraft, EditorError> {
    let mut form: F = serde_json::from_value(payload).map_err(|source| EditorError::Malformed {
        collection: F::COLLECTION,
        source,
    })?;
    form.sanitize();
    form.validate()?;

    let status = match form.status() {
        Some(raw) if !raw.trim().is_empty() => Status::parse_for(F::COLLECTION, raw)?,
        _ => F::COLLECTION.initial_status(),
    };
    if status.is_archived() {
        return Err(EditorError::ArchiveFromEditor);
    }

    // Forms skip `status` when serializing, so this is exactly the stored
    // field set.
    let fields = match serde_json::to_value(&form) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(source) => {
            return Err(EditorError::Malformed {
                collection: F::COLLECTION,
                source,
            })
        }
    };
    Ok(EditorDraft { status, fields })
}

/// Dispatch a payload to the collection's form.
pub fn parse_payload(collection: Collection, payload: Value) -> Result<EditorDraft, EditorError> {
    match collection {
        Collection::Services => build::<ServiceForm>(payload),
        Collection::Posts => build::<PostForm>(payload),
        Collection::Testimonials => build::<TestimonialForm>(payload),
        Collection::Leads => build::<LeadForm>(payload),
        Collection::CaseStudies => build::<CaseStudyForm>(payload),
    }
}

/// Lowercase, ASCII-alphanumeric words joined by single hyphens.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

pub(crate) fn trim(s: &mut String) {
    let t = s.trim();
    if t.len() != s.len() {
        *s = t.to_string();
    }
}

pub(crate) fn trim_opt(s: &mut Option<String>) {
    if let Some(v) = s.as_mut() {
        trim(v);
        if v.is_empty() {
            *s = None;
        }
    }
}

/// Trim entries, drop empties and duplicates, keep first-seen order.
pub(crate) fn clean_list(items: &mut Vec<String>) {
    let mut seen = Vec::with_capacity(items.len());
    for mut item in items.drain(..) {
        trim(&mut item);
        if !item.is_empty() && !seen.contains(&item) {
            seen.push(item);
        }
    }
    *items = seen;
}
