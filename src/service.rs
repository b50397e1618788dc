use std::sync::Arc;

use async_trait::async_trait;
use derive_more::From;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::info;

use crate::{
    allocator::{AllocationError, SpotAllocator, SpotRepository},
    db::{
        spot::Category,
        ticket::{self, Ticket},
        StorageError,
    },
    fare::{self, Rates},
};

/// Storage collaborator for tickets.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn has_open_ticket(
        &self,
        vehicle_id: &str,
    ) -> Result<bool, StorageError>;

    /// Persists a new ticket and returns the identifier the store assigned.
    async fn save_ticket(
        &self,
        ticket: &Ticket,
    ) -> Result<ticket::Id, StorageError>;

    /// Returns the vehicle's ticket with the latest entry time, if any.
    async fn most_recent_ticket(
        &self,
        vehicle_id: &str,
    ) -> Result<Option<Ticket>, StorageError>;

    /// Persists the price and exit time of a ticket being closed.
    async fn update_ticket(&self, ticket: &Ticket) -> Result<(), StorageError>;

    async fn count_tickets(
        &self,
        vehicle_id: &str,
    ) -> Result<usize, StorageError>;
}

/// Orchestrates the lifecycle of a stay: spot allocation and the open
/// ticket on entry, fare and spot reclamation on exit.
pub struct ParkingService {
    allocator: SpotAllocator,
    spots: Arc<dyn SpotRepository>,
    tickets: Arc<dyn TicketRepository>,
    rates: Rates,
}

#[derive(Debug)]
pub struct TicketCreated {
    pub ticket: Ticket,
    /// How many tickets the vehicle had before this stay, for loyalty
    /// messaging by the caller.
    pub previous_visits: usize,
}

#[derive(Debug)]
pub struct TicketClosed {
    pub ticket: Ticket,
    pub hours: i64,
    pub minutes: i64,
}

#[derive(Debug, From)]
pub enum EntryError {
    EmptyVehicleId,
    AlreadyParked,
    LotFull,
    #[from]
    Storage(StorageError),
}

impl From<AllocationError> for EntryError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::NoSpotAvailable => Self::LotFull,
            AllocationError::Storage(e) => Self::Storage(e),
        }
    }
}

#[derive(Debug, From)]
pub enum ExitError {
    EmptyVehicleId,
    TicketNotFound,
    NotCurrentlyParked,
    #[from]
    Fare(fare::Error),
    #[from]
    Storage(StorageError),
}

impl ParkingService {
    pub fn new(
        spots: Arc<dyn SpotRepository>,
        tickets: Arc<dyn TicketRepository>,
        rates: Rates,
    ) -> Self {
        Self {
            allocator: SpotAllocator::new(Arc::clone(&spots)),
            spots,
            tickets,
            rates,
        }
    }

    /// Parks a vehicle: allocates a spot of the requested category and
    /// opens a ticket for it.
    pub async fn process_entry(
        &self,
        vehicle_id: &str,
        category: Category,
    ) -> Result<TicketCreated, EntryError> {
        let vehicle_id = vehicle_id.trim();
        if vehicle_id.is_empty() {
            return Err(EntryError::EmptyVehicleId);
        }

        // At most one open ticket per vehicle. An implementation adding
        // concurrency safety must span this check and the insert below with
        // one mutual-exclusion scope on the vehicle's open-ticket row.
        if self.tickets.has_open_ticket(vehicle_id).await? {
            return Err(EntryError::AlreadyParked);
        }

        let mut spot = self.allocator.find_available(category).await?;

        // The spot is reserved before the ticket exists. A crash in between
        // leaves an unavailable spot and no ticket, never a double booking.
        spot.available = false;
        self.spots.update_spot(&spot).await?;

        let mut ticket = Ticket {
            id: ticket::Id::default(),
            spot,
            vehicle_id: vehicle_id.to_string(),
            entry_time: OffsetDateTime::now_utc(),
            exit_time: None,
            price: Decimal::ZERO,
        };
        ticket.id = self.tickets.save_ticket(&ticket).await?;

        let previous_visits =
            self.tickets.count_tickets(vehicle_id).await?.saturating_sub(1);

        info!(
            "vehicle {vehicle_id} parked at spot {} ({previous_visits} \
             earlier visits)",
            ticket.spot.id,
        );

        Ok(TicketCreated {
            ticket,
            previous_visits,
        })
    }

    /// Bills and closes the stay of a parked vehicle, then reclaims its
    /// spot.
    pub async fn process_exit(
        &self,
        vehicle_id: &str,
    ) -> Result<TicketClosed, ExitError> {
        let vehicle_id = vehicle_id.trim();
        if vehicle_id.is_empty() {
            return Err(ExitError::EmptyVehicleId);
        }

        let mut ticket = self
            .tickets
            .most_recent_ticket(vehicle_id)
            .await?
            .ok_or(ExitError::TicketNotFound)?;
        if !ticket.is_open() {
            return Err(ExitError::NotCurrentlyParked);
        }

        let exit_time = OffsetDateTime::now_utc();
        let visits = self.tickets.count_tickets(vehicle_id).await?;
        let price = fare::compute(
            ticket.entry_time,
            exit_time,
            ticket.spot.category,
            visits > 1,
            &self.rates,
        )?;

        ticket.exit_time = Some(exit_time);
        ticket.price = price;
        // The spot stays reserved until the closed ticket is durably
        // stored; a failed update is reported and the caller may retry.
        self.tickets.update_ticket(&ticket).await?;
        self.allocator.release(&ticket.spot).await?;

        let stayed = (exit_time - ticket.entry_time).whole_minutes();
        info!(
            "vehicle {vehicle_id} left spot {} after {stayed} min",
            ticket.spot.id,
        );

        Ok(TicketClosed {
            ticket,
            hours: stayed / 60,
            minutes: stayed % 60,
        })
    }
}
