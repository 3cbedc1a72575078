//! Bitstamp public market-data client library.
//!
//! Provides point-in-time REST queries (ticker, order book, trades) and a
//! persistent websocket client that streams order book snapshots, with
//! strict decoding of Bitstamp's string-encoded numbers into typed records.

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod rest;
pub mod websocket;

pub use client::Bitstamp;
pub use error::{Result, StampedeError};
