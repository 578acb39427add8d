//! Waypost - Admission Control and Proximity Search
//!
//! This crate implements the request-path core of a location-discovery API:
//! a sliding-window rate limiter with in-process and shared backends behind
//! a common trait, a request classifier feeding an admission middleware, and
//! a geospatial proximity search engine built on a bounding-box pre-filter
//! and exact great-circle distances. Persistence, authentication, and the
//! HTTP server itself are collaborators supplied by the embedding
//! application.

pub mod admission;
pub mod config;
pub mod error;
pub mod geo;
pub mod ratelimit;
