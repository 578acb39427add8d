//! Geospatial utilities and the proximity search engine.

mod math;
mod provider;
mod query;

pub use math::{
    haversine_km, km_to_miles, miles_to_km, normalize_longitude, BoundingBox, GeoPoint,
    EARTH_RADIUS_KM,
};
pub use provider::{AttributeFilters, PlaceRecord, RecordProvider};
pub use query::{
    filter_within_radius, sort_by_distance, GeoQueryEngine, SearchQuery, SearchResult,
    MAX_RADIUS_KM,
};
