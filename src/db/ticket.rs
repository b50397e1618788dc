use std::error::Error as StdError;

use async_trait::async_trait;
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio_postgres::types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};

use super::{spot, Client, StorageError};
use crate::service::TicketRepository;

/// One vehicle's stay: open while the vehicle is parked, closed with a
/// price once it exits. Closed tickets are never modified again.
#[derive(Clone, Debug)]
pub struct Ticket {
    pub id: Id,
    pub spot: spot::Spot,
    pub vehicle_id: String,
    pub entry_time: OffsetDateTime,
    pub exit_time: Option<OffsetDateTime>,
    pub price: Decimal,
}

impl Ticket {
    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq,
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

#[async_trait]
impl TicketRepository for Client {
    async fn has_open_ticket(
        &self,
        vehicle_id: &str,
    ) -> Result<bool, StorageError> {
        const SQL: &str = "\
            SELECT EXISTS (\
                SELECT 1 FROM tickets \
                WHERE vehicle_id = $1 AND exit_time IS NULL\
            )";
        Ok(self.0.query_one(SQL, &[&vehicle_id]).await?.get(0))
    }

    async fn save_ticket(&self, ticket: &Ticket) -> Result<Id, StorageError> {
        const SQL: &str = "\
            INSERT INTO tickets (spot_id, vehicle_id, entry_time, \
                                 exit_time, price) \
            VALUES ($1, $2, $3, $4, $5) \
            RETURNING id";
        Ok(self
            .0
            .query_one(
                SQL,
                &[
                    &ticket.spot.id,
                    &ticket.vehicle_id,
                    &ticket.entry_time,
                    &ticket.exit_time,
                    &ticket.price,
                ],
            )
            .await?
            .get("id"))
    }

    async fn most_recent_ticket(
        &self,
        vehicle_id: &str,
    ) -> Result<Option<Ticket>, StorageError> {
        const SQL: &str = "\
            SELECT t.id, t.vehicle_id, t.entry_time, t.exit_time, t.price, \
                   s.id AS spot_id, s.category, s.available \
            FROM tickets t \
            JOIN spots s ON s.id = t.spot_id \
            WHERE t.vehicle_id = $1 \
            ORDER BY t.entry_time DESC \
            LIMIT 1";
        Ok(self.0.query_opt(SQL, &[&vehicle_id]).await?.map(|row| {
            Ticket {
                id: row.get("id"),
                spot: spot::Spot {
                    id: row.get("spot_id"),
                    category: row.get("category"),
                    available: row.get("available"),
                },
                vehicle_id: row.get("vehicle_id"),
                entry_time: row.get("entry_time"),
                exit_time: row.get("exit_time"),
                price: row.get("price"),
            }
        }))
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<(), StorageError> {
        const SQL: &str = "\
            UPDATE tickets SET price = $1, exit_time = $2 WHERE id = $3";
        let updated = self
            .0
            .execute(SQL, &[&ticket.price, &ticket.exit_time, &ticket.id])
            .await?;
        if updated != 1 {
            return Err(StorageError::new(format!(
                "ticket {} is missing",
                ticket.id,
            )));
        }
        Ok(())
    }

    async fn count_tickets(
        &self,
        vehicle_id: &str,
    ) -> Result<usize, StorageError> {
        const SQL: &str = "\
            SELECT COUNT(*) FROM tickets WHERE vehicle_id = $1";
        Ok(self
            .0
            .query_one(SQL, &[&vehicle_id])
            .await?
            .get::<_, i64>(0)
            .try_into()
            .unwrap())
    }
}
