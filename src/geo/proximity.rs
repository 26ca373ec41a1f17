//! Radius filtering over geo-tagged records.

use tracing::debug;

use super::{distance_km, GeoPoint, Geotagged};
use crate::error::StorageResult;
use crate::storage::{Location, SharedStorage, TrackingPoint, TrackingType};

/// Keep the candidates within `radius_km` of `center`, in input order.
///
/// A linear scan. A radius at or below zero keeps only points coincident
/// with the center; a NaN radius keeps nothing.
pub fn find_within_radius<T>(center: GeoPoint, radius_km: f64, candidates: &[T]) -> Vec<T>
where
    T: Geotagged + Clone,
{
    let radius_km = if radius_km < 0.0 { 0.0 } else { radius_km };
    candidates
        .iter()
        .filter(|c| distance_km(center, c.point()) <= radius_km)
        .cloned()
        .collect()
}

/// Runs [`find_within_radius`] over records loaded from storage.
#[derive(Clone)]
pub struct NearbySearch {
    storage: SharedStorage,
}

impl NearbySearch {
    /// Create a search over the given storage
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// Stored locations from any session within the radius.
    pub async fn locations_near(
        &self,
        center: GeoPoint,
        radius_km: f64,
    ) -> StorageResult<Vec<Location>> {
        let candidates = self.storage.get_all_locations().await?;
        let found = find_within_radius(center, radius_km, &candidates);
        debug!(
            candidates = candidates.len(),
            found = found.len(),
            radius_km,
            "Nearby locations"
        );
        Ok(found)
    }

    /// A session's tracking points within the radius, optionally of one type.
    pub async fn tracking_points_near(
        &self,
        session_id: &str,
        center: GeoPoint,
        radius_km: f64,
        point_type: Option<TrackingType>,
    ) -> StorageResult<Vec<TrackingPoint>> {
        let candidates = self
            .storage
            .get_session_tracking_points(session_id, point_type)
            .await?;
        Ok(find_within_radius(center, radius_km, &candidates))
    }
}
