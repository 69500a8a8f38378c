use std::fmt;

use serde::{Deserialize, Serialize};

use super::collection::Collection;

/// Item status. Which values are legal depends on the collection; see
/// [`Collection::statuses`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Draft,
    Active,
    Published,
    New,
    Contacted,
    Archived,
}

const ALL_STATUSES: [Status; 6] = [
    Status::Draft,
    Status::Active,
    Status::Published,
    Status::New,
    Status::Contacted,
    Status::Archived,
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("unknown status '{0}'")]
    Unknown(String),
    #[error("status '{status}' is not valid for {collection}")]
    NotInCollection {
        collection: Collection,
        status: Status,
    },
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Draft => "Draft",
            Status::Active => "Active",
            Status::Published => "Published",
            Status::New => "New",
            Status::Contacted => "Contacted",
            Status::Archived => "Archived",
        }
    }

    pub fn is_archived(self) -> bool {
        self == Status::Archived
    }

    /// Parse a raw status string for a given collection. Matching is
    /// case-insensitive and ignores surrounding whitespace; the value must
    /// belong to the collection's set.
    pub fn parse_for(collection: Collection, raw: &str) -> Result<Status, StatusError> {
        let raw = raw.trim();
        let status = ALL_STATUSES
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| StatusError::Unknown(raw.to_string()))?;
        if collection.accepts(status) {
            Ok(status)
        } else {
            Err(StatusError::NotInCollection { collection, status })
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_collection_scoped() {
        assert_eq!(
            Status::parse_for(Collection::Posts, "published").unwrap(),
            Status::Published
        );
        assert_eq!(
            Status::parse_for(Collection::Services, "Published"),
            Err(StatusError::NotInCollection {
                collection: Collection::Services,
                status: Status::Published,
            })
        );
        assert_eq!(
            Status::parse_for(Collection::Leads, " Contacted ").unwrap(),
            Status::Contacted
        );
    }

    #[test]
    fn parse_rejects_free_text() {
        assert_eq!(
            Status::parse_for(Collection::Posts, "Live"),
            Err(StatusError::Unknown("Live".into()))
        );
        assert!(Status::parse_for(Collection::Posts, "").is_err());
    }
}
