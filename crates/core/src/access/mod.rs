//! Role-based access control for the admin console.

pub mod policy;
pub mod role;

pub use policy::{
    allows, authorize, authorize_capability, capabilities, has_capability, row_actions,
    visible_collections, AccessDenied, Capability, Operation, RowActions,
};
pub use role::Role;
