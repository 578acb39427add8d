//! Record provider boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::math::BoundingBox;

/// A discoverable place as served by the record provider.
///
/// Coordinates are optional: ingested records occasionally arrive without
/// them, and the geo filter treats such records as non-matching rather than
/// erroring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub wheelchair_accessible: bool,
    #[serde(default)]
    pub average_rating: Option<f64>,
}

/// Attribute predicates applied to candidate records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeFilters {
    pub category: Option<String>,
    pub verified: Option<bool>,
    pub wheelchair_accessible: Option<bool>,
}

impl AttributeFilters {
    pub fn matches(&self, record: &PlaceRecord) -> bool {
        if let Some(category) = &self.category {
            if &record.category != category {
                return false;
            }
        }
        if let Some(verified) = self.verified {
            if record.verified != verified {
                return false;
            }
        }
        if let Some(accessible) = self.wheelchair_accessible {
            if record.wheelchair_accessible != accessible {
                return false;
            }
        }
        true
    }
}

/// Storage-layer collaborator supplying candidate records.
///
/// `records_within_box` is a plain range predicate over stored coordinates,
/// not a spatial index; the search engine narrows candidates further with
/// exact distances. Implementations may serve an eventually consistent
/// snapshot.
#[async_trait]
pub trait RecordProvider: Send + Sync {
    /// Records whose stored coordinates fall inside the box.
    async fn records_within_box(&self, bounds: &BoundingBox) -> Vec<PlaceRecord>;

    /// Records matching the attribute filters, paginated by the provider.
    async fn records_by_attributes(
        &self,
        filters: &AttributeFilters,
        limit: usize,
        offset: usize,
    ) -> Vec<PlaceRecord>;
}
