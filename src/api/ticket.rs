use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{api, db};

pub use crate::db::ticket::Id;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Id,
    pub spot: api::Spot,
    pub vehicle_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub entry_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub exit_time: Option<OffsetDateTime>,
    pub price: Decimal,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Created {
    pub ticket: Ticket,
    pub previous_visits: usize,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Closed {
    pub ticket: Ticket,
    pub hours: i64,
    pub minutes: i64,
}

impl From<db::Ticket> for Ticket {
    fn from(ticket: db::Ticket) -> Self {
        Self {
            id: ticket.id,
            spot: ticket.spot.into(),
            vehicle_id: ticket.vehicle_id,
            entry_time: ticket.entry_time,
            exit_time: ticket.exit_time,
            price: ticket.price,
        }
    }
}
