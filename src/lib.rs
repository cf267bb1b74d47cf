//! Driving-behaviour rating from recorded GPS traces.
//!
//! Traces are cleaned ([`preprocess`]), scanned for maneuvers
//! ([`detectors`]), summed per agent ([`aggregate`], [`stats`]) and scored
//! against a population ([`scoring`]).

pub mod aggregate;
pub mod config;
pub mod detectors;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod parser;
pub mod preprocess;
pub mod scoring;
pub mod services;
pub mod stats;
pub mod trace;
