//! HTTP implementations of the collaborator traits in [`crate::services`].

pub mod roads;
pub mod tripstore;
