//! Domain core of the agency site console: roles and the permission policy,
//! content collections and their archive lifecycle, editor validation,
//! session state, the store interface with its memory and Postgres
//! backends, and the content manager that ties them together.

pub mod access;
pub mod auth;
pub mod content;
pub mod editor;
pub mod events;
pub mod lifecycle;
pub mod manager;
pub mod session;
pub mod store;

pub use manager::{CollectionView, ContentManager, ItemView, Listing, ManagerError, Mutation, Row};
