use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::status::Status;

/// A named, independently permissioned set of content items.
///
/// Each collection maps 1:1 to a table of the same name in the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Services,
    Posts,
    Testimonials,
    Leads,
    CaseStudies,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Services,
        Collection::Posts,
        Collection::Testimonials,
        Collection::Leads,
        Collection::CaseStudies,
    ];

    /// Table name in the content store. Always a static identifier, safe to
    /// interpolate into SQL.
    pub fn table(self) -> &'static str {
        match self {
            Collection::Services => "services",
            Collection::Posts => "posts",
            Collection::Testimonials => "testimonials",
            Collection::Leads => "leads",
            Collection::CaseStudies => "case_studies",
        }
    }

    /// Human label used in access-denied and confirmation copy.
    pub fn label(self) -> &'static str {
        match self {
            Collection::Services => "Services",
            Collection::Posts => "Blog posts",
            Collection::Testimonials => "Testimonials",
            Collection::Leads => "Leads",
            Collection::CaseStudies => "Case studies",
        }
    }

    /// Legal status values, in the order an editor offers them.
    pub fn statuses(self) -> &'static [Status] {
        match self {
            Collection::Services | Collection::Testimonials => {
                &[Status::Draft, Status::Active, Status::Archived]
            }
            Collection::Posts | Collection::CaseStudies => {
                &[Status::Draft, Status::Published, Status::Archived]
            }
            Collection::Leads => &[Status::New, Status::Contacted, Status::Archived],
        }
    }

    /// Statuses an editor may write. `Archived` is only reachable through
    /// the archive action.
    pub fn editable_statuses(self) -> impl Iterator<Item = Status> {
        self.statuses()
            .iter()
            .copied()
            .filter(|s| !s.is_archived())
    }

    pub fn initial_status(self) -> Status {
        match self {
            Collection::Leads => Status::New,
            _ => Status::Draft,
        }
    }

    /// Status an archived item returns to when restored.
    pub fn restore_status(self) -> Status {
        self.initial_status()
    }

    /// The status that marks an item as live on the public site. Leads are
    /// never public.
    pub fn public_status(self) -> Option<Status> {
        match self {
            Collection::Services | Collection::Testimonials => Some(Status::Active),
            Collection::Posts | Collection::CaseStudies => Some(Status::Published),
            Collection::Leads => None,
        }
    }

    pub fn accepts(self, status: Status) -> bool {
        self.statuses().contains(&status)
    }

    /// Whether items of this collection carry an `author_id`.
    pub fn has_author(self) -> bool {
        matches!(self, Collection::Posts)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown collection: {0}")]
pub struct UnknownCollection(pub String);

impl FromStr for Collection {
    type Err = UnknownCollection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.table() == s)
            .ok_or_else(|| UnknownCollection(s.to_string()))
    }
}
