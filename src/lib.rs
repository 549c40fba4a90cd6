//! Throttle - Per-Client Request Throttling
//!
//! This crate implements a fixed-window rate limiter that sits in front of
//! HTTP request handling and rejects excess traffic from a single client.
//! Per-client state lives in a sharded bucket table that a background
//! evictor sweeps to keep memory bounded.

pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
