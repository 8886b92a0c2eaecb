//! Client for the ceilometer metering API, and the report tools that flatten what it returns
//! into CSV files.

pub mod auth;
pub mod cli;
pub mod client;
pub mod dump;
pub mod error;
pub mod meter;
pub mod sink;

pub use client::{Client, Config, Credentials, TimeRange};
pub use error::{Error, Scope};
