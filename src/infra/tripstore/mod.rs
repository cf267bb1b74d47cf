mod client;

pub use client::HttpTripStore;
