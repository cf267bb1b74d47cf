//! Collaborator interfaces the core calls into.

pub mod speed_limit;
pub mod trip_store;
