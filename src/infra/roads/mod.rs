mod client;

pub use client::{HttpSpeedLimits, to_meters_per_second};
