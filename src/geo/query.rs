//! Proximity search: bounding-box pre-filter, exact distance, ranking,
//! pagination.

use std::sync::Arc;

use serde::Serialize;
use tracing::trace;

use crate::config::SearchSettings;
use crate::error::{Result, WaypostError};

use super::math::{haversine_km, BoundingBox, GeoPoint};
use super::provider::{AttributeFilters, PlaceRecord, RecordProvider};

/// Largest radius a search may request, in kilometers.
pub const MAX_RADIUS_KM: f64 = 500.0;

/// Parameters of one proximity search.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub center: GeoPoint,
    pub radius_km: f64,
    pub filters: AttributeFilters,
    pub limit: usize,
    pub offset: usize,
}

impl SearchQuery {
    /// A first-page query with no attribute filters, sized by the configured
    /// default page limit.
    pub fn new(center: GeoPoint, radius_km: f64, settings: &SearchSettings) -> Self {
        Self {
            center,
            radius_km,
            filters: AttributeFilters::default(),
            limit: settings.default_limit,
            offset: 0,
        }
    }
}

/// A record paired with its exact distance from the query center.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub record: PlaceRecord,
    /// Kilometers from the query center, rounded to 2 decimals
    pub distance_km: f64,
}

/// Read-only, stateless search engine over a record provider.
///
/// Any number of searches may run concurrently; consistency of the candidate
/// snapshot is the provider's concern.
pub struct GeoQueryEngine {
    provider: Arc<dyn RecordProvider>,
    max_radius_km: f64,
}

impl GeoQueryEngine {
    pub fn new(provider: Arc<dyn RecordProvider>) -> Self {
        Self::with_max_radius(provider, MAX_RADIUS_KM)
    }

    pub fn with_max_radius(provider: Arc<dyn RecordProvider>, max_radius_km: f64) -> Self {
        Self {
            provider,
            max_radius_km,
        }
    }

    /// Engine honoring the configured radius ceiling.
    pub fn from_settings(provider: Arc<dyn RecordProvider>, settings: &SearchSettings) -> Self {
        Self::with_max_radius(provider, settings.max_radius_km)
    }

    /// Find records within `radius_km` of the center, ranked by distance.
    ///
    /// The center is validated at `GeoPoint` construction; the radius is
    /// validated here, before any box arithmetic or candidate fetch. Results
    /// are sorted ascending by distance with record id as the tie-break so
    /// paginated pages stay deterministic.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        if !(query.radius_km > 0.0 && query.radius_km <= self.max_radius_km) {
            return Err(WaypostError::InvalidRadius(format!(
                "radius must be between 0 and {} km, got {}",
                self.max_radius_km, query.radius_km
            )));
        }

        let bounds = BoundingBox::around(&query.center, query.radius_km);
        let candidates = self.provider.records_within_box(&bounds).await;

        trace!(
            candidates = candidates.len(),
            radius_km = query.radius_km,
            "Ranking proximity search candidates"
        );

        // Attribute filters run before the distance pass to shrink its input.
        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .filter(|record| query.filters.matches(record))
            .filter_map(|record| {
                let point = record_point(&record)?;
                let distance = haversine_km(&query.center, &point);
                // The box over-admits near its corners.
                (distance <= query.radius_km).then(|| SearchResult {
                    distance_km: round2(distance),
                    record,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });

        Ok(results
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    /// Attribute-only query with no center: served directly by the provider,
    /// skipping all geo work.
    pub async fn search_by_attributes(
        &self,
        filters: &AttributeFilters,
        limit: usize,
        offset: usize,
    ) -> Vec<PlaceRecord> {
        self.provider.records_by_attributes(filters, limit, offset).await
    }
}

/// Rank a list of records by distance from an origin, nearest first.
///
/// Utility for collaborators holding an already-fetched list; records
/// without coordinates are dropped.
pub fn sort_by_distance(origin: &GeoPoint, records: Vec<PlaceRecord>) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = records
        .into_iter()
        .filter_map(|record| {
            let point = record_point(&record)?;
            Some(SearchResult {
                distance_km: round2(haversine_km(origin, &point)),
                record,
            })
        })
        .collect();

    results.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    results
}

/// Keep only the records within `radius_km` of the origin, with distances.
pub fn filter_within_radius(
    origin: &GeoPoint,
    radius_km: f64,
    records: Vec<PlaceRecord>,
) -> Vec<SearchResult> {
    records
        .into_iter()
        .filter_map(|record| {
            let point = record_point(&record)?;
            let distance = haversine_km(origin, &point);
            (distance <= radius_km).then(|| SearchResult {
                distance_km: round2(distance),
                record,
            })
        })
        .collect()
}

/// Stored coordinates as a validated point; `None` when the record has no
/// coordinates or they are out of range.
fn record_point(record: &PlaceRecord) -> Option<GeoPoint> {
    match (record.latitude, record.longitude) {
        (Some(lat), Some(lon)) => GeoPoint::new(lat, lon).ok(),
        _ => None,
    }
}

fn round2(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    struct VecProvider {
        records: Vec<PlaceRecord>,
    }

    #[async_trait]
    impl RecordProvider for VecProvider {
        async fn records_within_box(&self, bounds: &BoundingBox) -> Vec<PlaceRecord> {
            self.records
                .iter()
                .filter(|r| match (r.latitude, r.longitude) {
                    (Some(lat), Some(lon)) => bounds.contains(lat, lon),
                    _ => false,
                })
                .cloned()
                .collect()
        }

        async fn records_by_attributes(
            &self,
            filters: &AttributeFilters,
            limit: usize,
            offset: usize,
        ) -> Vec<PlaceRecord> {
            self.records
                .iter()
                .filter(|r| filters.matches(r))
                .skip(offset)
                .take(limit)
                .cloned()
                .collect()
        }
    }

    fn record_at(name: &str, lat: f64, lon: f64) -> PlaceRecord {
        PlaceRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: "water_fountain".to_string(),
            latitude: Some(lat),
            longitude: Some(lon),
            verified: false,
            wheelchair_accessible: false,
            average_rating: None,
        }
    }

    fn engine(records: Vec<PlaceRecord>) -> GeoQueryEngine {
        GeoQueryEngine::new(Arc::new(VecProvider { records }))
    }

    fn query(center: GeoPoint, radius_km: f64) -> SearchQuery {
        SearchQuery {
            center,
            radius_km,
            filters: AttributeFilters::default(),
            limit: 50,
            offset: 0,
        }
    }

    #[tokio::test]
    async fn test_exact_match_and_distant_record_at_high_latitude() {
        // Scenario: 1 km radius around Seattle. A record at the center is
        // returned with distance 0.00; one 50 km east at the same latitude
        // is excluded even though an unguarded box might admit it.
        let center = GeoPoint::new(47.6062, -122.3321).unwrap();
        let same_spot = record_at("here", 47.6062, -122.3321);
        // ~50 km east: 1 degree of longitude at 47.6N is ~75 km.
        let far_east = record_at("far", 47.6062, -121.6654);

        let engine = engine(vec![same_spot, far_east]);
        let results = engine.search(&query(center, 1.0)).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.name, "here");
        assert_eq!(results[0].distance_km, 0.0);
    }

    #[tokio::test]
    async fn test_results_ordered_and_paginated() {
        // 20 records at strictly increasing distances along the meridian;
        // limit=5 offset=5 must return the 6th through 10th nearest.
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let records: Vec<PlaceRecord> = (1..=20)
            .map(|i| record_at(&format!("r{i}"), 0.01 * i as f64, 0.0))
            .collect();

        let engine = engine(records);
        let mut q = query(center, 100.0);
        q.limit = 5;
        q.offset = 5;

        let results = engine.search(&q).await.unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.record.name.as_str()).collect();
        assert_eq!(names, ["r6", "r7", "r8", "r9", "r10"]);

        for pair in results.windows(2) {
            assert!(pair[0].distance_km <= pair[1].distance_km);
        }
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_radius() {
        let engine = engine(vec![]);
        let center = GeoPoint::new(0.0, 0.0).unwrap();

        for bad_radius in [0.0, -1.0, 500.1] {
            let result = engine.search(&query(center, bad_radius)).await;
            assert!(matches!(result, Err(WaypostError::InvalidRadius(_))));
        }

        assert!(engine.search(&query(center, 500.0)).await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_center_never_constructed() {
        // Latitude 91 fails at GeoPoint construction, before any fetch.
        assert!(matches!(
            GeoPoint::new(91.0, 0.0),
            Err(WaypostError::InvalidLocation(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_coordinates_are_non_matching() {
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let mut nameless = record_at("no-coords", 0.0, 0.0);
        nameless.latitude = None;

        let engine = engine(vec![nameless, record_at("here", 0.001, 0.0)]);
        let results = engine.search(&query(center, 5.0)).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.name, "here");
    }

    #[tokio::test]
    async fn test_attribute_filters_applied() {
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let mut verified = record_at("verified", 0.01, 0.0);
        verified.verified = true;
        let unverified = record_at("unverified", 0.005, 0.0);

        let engine = engine(vec![verified, unverified]);
        let mut q = query(center, 10.0);
        q.filters.verified = Some(true);

        let results = engine.search(&q).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.name, "verified");
    }

    #[tokio::test]
    async fn test_equal_distances_tie_break_on_id() {
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let a = record_at("a", 0.01, 0.0);
        let b = record_at("b", -0.01, 0.0);
        let expected_first = a.id.min(b.id);

        let engine = engine(vec![a, b]);
        let results = engine.search(&query(center, 10.0)).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.id, expected_first);
    }

    #[tokio::test]
    async fn test_distances_rounded_to_two_decimals() {
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let engine = engine(vec![record_at("r", 0.1, 0.1)]);

        let results = engine.search(&query(center, 50.0)).await.unwrap();
        let distance = results[0].distance_km;
        assert_eq!(distance, (distance * 100.0).round() / 100.0);
    }

    #[tokio::test]
    async fn test_attribute_only_query_skips_geo_work() {
        let mut no_coords = record_at("no-coords", 0.0, 0.0);
        no_coords.latitude = None;
        no_coords.longitude = None;

        let engine = engine(vec![no_coords]);
        let results = engine
            .search_by_attributes(&AttributeFilters::default(), 10, 0)
            .await;

        // Records without coordinates are still reachable this way.
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_settings_drive_radius_ceiling_and_page_size() {
        let settings = SearchSettings {
            max_radius_km: 50.0,
            default_limit: 2,
        };
        let center = GeoPoint::new(0.0, 0.0).unwrap();
        let records: Vec<PlaceRecord> = (1..=4)
            .map(|i| record_at(&format!("r{i}"), 0.01 * i as f64, 0.0))
            .collect();
        let engine =
            GeoQueryEngine::from_settings(Arc::new(VecProvider { records }), &settings);

        let over_ceiling = SearchQuery::new(center, 51.0, &settings);
        assert!(matches!(
            engine.search(&over_ceiling).await,
            Err(WaypostError::InvalidRadius(_))
        ));

        let first_page = SearchQuery::new(center, 50.0, &settings);
        let results = engine.search(&first_page).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.name, "r1");
    }

    #[test]
    fn test_sort_by_distance_helper() {
        let origin = GeoPoint::new(0.0, 0.0).unwrap();
        let far = record_at("far", 1.0, 0.0);
        let near = record_at("near", 0.1, 0.0);

        let sorted = sort_by_distance(&origin, vec![far, near]);
        assert_eq!(sorted[0].record.name, "near");
        assert_eq!(sorted[1].record.name, "far");
    }

    #[test]
    fn test_filter_within_radius_helper() {
        let origin = GeoPoint::new(0.0, 0.0).unwrap();
        let inside = record_at("inside", 0.01, 0.0);
        let outside = record_at("outside", 2.0, 0.0);

        let kept = filter_within_radius(&origin, 5.0, vec![inside, outside]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].record.name, "inside");
    }
}
