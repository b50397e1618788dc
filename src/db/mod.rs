pub mod spot;
pub mod ticket;

use std::error::Error as StdError;

use derive_more::Display;
use tokio_postgres::{tls::NoTlsStream, NoTls, Socket};

use crate::config;

pub use tokio_postgres::Error;

pub use self::{spot::Spot, ticket::Ticket};

pub type Connection = tokio_postgres::Connection<Socket, NoTlsStream>;

pub async fn connect(
    config: config::Db,
) -> Result<(Client, Connection), Error> {
    tokio_postgres::connect(&config.url, NoTls)
        .await
        .map(|(client, connection)| (Client(client), connection))
}

pub struct Client(tokio_postgres::Client);

/// Opaque failure of the backing store.
///
/// Repository collaborators surface every backend problem through this one
/// type, so callers can only report it and retry, never interpret it.
#[derive(Debug, Display)]
pub struct StorageError(Box<dyn StdError + Send + Sync>);

impl StorageError {
    pub fn new(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(err.into())
    }
}

impl From<Error> for StorageError {
    fn from(err: Error) -> Self {
        Self(err.into())
    }
}
