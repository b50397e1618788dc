use std::sync::Arc;

use async_trait::async_trait;
use derive_more::From;

use crate::db::{
    spot::{Category, Id, Spot},
    StorageError,
};

/// Storage collaborator for parking spots.
#[async_trait]
pub trait SpotRepository: Send + Sync {
    /// Returns the available spot of the category with the lowest id,
    /// if any.
    async fn get_next_available_spot(
        &self,
        category: Category,
    ) -> Result<Option<Spot>, StorageError>;

    async fn update_spot(&self, spot: &Spot) -> Result<(), StorageError>;

    async fn get_spot_by_id(
        &self,
        id: Id,
    ) -> Result<Option<Spot>, StorageError>;
}

/// Hands out and reclaims parking spots per vehicle category.
///
/// Selection never flips the availability flag itself; the caller persists
/// that as its own explicit step.
pub struct SpotAllocator {
    spots: Arc<dyn SpotRepository>,
}

#[derive(Debug, From)]
pub enum AllocationError {
    /// The lot has no free spot of the requested category.
    NoSpotAvailable,
    #[from]
    Storage(StorageError),
}

impl SpotAllocator {
    pub fn new(spots: Arc<dyn SpotRepository>) -> Self {
        Self { spots }
    }

    pub async fn find_available(
        &self,
        category: Category,
    ) -> Result<Spot, AllocationError> {
        self.spots
            .get_next_available_spot(category)
            .await?
            .ok_or(AllocationError::NoSpotAvailable)
    }

    /// Marks a spot available again.
    ///
    /// Releasing a spot that is already available is a no-op success.
    pub async fn release(&self, spot: &Spot) -> Result<(), StorageError> {
        let current = self
            .spots
            .get_spot_by_id(spot.id)
            .await?
            .ok_or_else(|| {
                StorageError::new(format!(
                    "spot {} is not provisioned",
                    spot.id,
                ))
            })?;
        if current.available {
            return Ok(());
        }

        self.spots
            .update_spot(&Spot {
                available: true,
                ..current
            })
            .await
    }
}
