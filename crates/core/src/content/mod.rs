//! Content collections, their statuses and row types.

pub mod collection;
pub mod item;
pub mod status;

pub use collection::{Collection, UnknownCollection};
pub use item::{AuthorRef, Category, ContentItem, ItemId, Notification, SiteSetting};
pub use status::{Status, StatusError};
