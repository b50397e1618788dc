use std::error::Error as StdError;

use async_trait::async_trait;
use derive_more::Display;
use enum_utils::TryFromRepr;
use serde::{Deserialize, Serialize};
use tokio_postgres::types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};

use super::{Client, StorageError};
use crate::allocator::SpotRepository;

/// A physical parking location of a fixed vehicle category.
///
/// The category never changes after provisioning; only `available` is
/// toggled as tickets come and go.
#[derive(Clone, Debug, PartialEq)]
pub struct Spot {
    pub id: Id,
    pub category: Category,
    pub available: bool,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct Id(i32);

impl From<i32> for Id {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl FromSql<'_> for Id {
    accepts!(INT4);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        i32::from_sql(ty, raw).map(Self)
    }
}

impl ToSql for Id {
    accepts!(INT4);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.0.to_sql(ty, out)
    }
}

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, TryFromRepr, PartialEq, Serialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Category {
    Car = 1,
    Bike = 2,
}

impl FromSql<'_> for Category {
    accepts!(INT2);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        let repr = i16::from_sql(ty, raw)?;
        let repr = u8::try_from(repr)?;
        let category =
            Self::try_from(repr).map_err(|_| "unknown category")?;
        Ok(category)
    }
}

impl ToSql for Category {
    accepts!(INT2);

    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        let repr = i16::from((*self) as u8);
        repr.to_sql(ty, out)
    }
}

#[async_trait]
impl SpotRepository for Client {
    async fn get_next_available_spot(
        &self,
        category: Category,
    ) -> Result<Option<Spot>, StorageError> {
        const SQL: &str = "\
            SELECT id, category, available \
            FROM spots \
            WHERE category = $1 AND available \
            ORDER BY id \
            LIMIT 1";
        Ok(self.0.query_opt(SQL, &[&category]).await?.map(|row| Spot {
            id: row.get("id"),
            category: row.get("category"),
            available: row.get("available"),
        }))
    }

    async fn update_spot(&self, spot: &Spot) -> Result<(), StorageError> {
        const SQL: &str = "UPDATE spots SET available = $1 WHERE id = $2";
        let updated = self
            .0
            .execute(SQL, &[&spot.available, &spot.id])
            .await?;
        if updated != 1 {
            return Err(StorageError::new(format!(
                "spot {} is not provisioned",
                spot.id,
            )));
        }
        Ok(())
    }

    async fn get_spot_by_id(
        &self,
        id: Id,
    ) -> Result<Option<Spot>, StorageError> {
        const SQL: &str = "\
            SELECT id, category, available \
            FROM spots \
            WHERE id = $1";
        Ok(self.0.query_opt(SQL, &[&id]).await?.map(|row| Spot {
            id: row.get("id"),
            category: row.get("category"),
            available: row.get("available"),
        }))
    }
}
