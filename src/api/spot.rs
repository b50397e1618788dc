use serde::{Deserialize, Serialize};

use crate::db;

pub use crate::db::spot::{Category, Id};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub id: Id,
    pub category: Category,
    pub available: bool,
}

impl From<db::Spot> for Spot {
    fn from(spot: db::Spot) -> Self {
        Self {
            id: spot.id,
            category: spot.category,
            available: spot.available,
        }
    }
}
