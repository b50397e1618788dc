use std::sync::{
    atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use parkwise::{
    allocator::SpotRepository,
    db::{
        spot::{Category, Spot},
        ticket::{self, Ticket},
        StorageError,
    },
    fare::Rates,
    service::{ParkingService, TicketRepository},
};
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};

pub struct FakeSpots {
    spots: Mutex<Vec<Spot>>,
    pub updates: AtomicUsize,
    pub fail_updates: AtomicBool,
}

impl FakeSpots {
    pub fn new(spots: Vec<Spot>) -> Arc<Self> {
        Arc::new(Self {
            spots: Mutex::new(spots),
            updates: AtomicUsize::new(0),
            fail_updates: AtomicBool::new(false),
        })
    }

    pub fn get(&self, id: i32) -> Spot {
        self.spots
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id.into())
            .expect("spot is seeded")
            .clone()
    }
}

#[async_trait]
impl SpotRepository for FakeSpots {
    async fn get_next_available_spot(
        &self,
        category: Category,
    ) -> Result<Option<Spot>, StorageError> {
        Ok(self
            .spots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.category == category && s.available)
            .min_by_key(|s| s.id)
            .cloned())
    }

    async fn update_spot(&self, spot: &Spot) -> Result<(), StorageError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StorageError::new("spot store is down"));
        }
        self.updates.fetch_add(1, Ordering::SeqCst);

        let mut spots = self.spots.lock().unwrap();
        let stored = spots
            .iter_mut()
            .find(|s| s.id == spot.id)
            .ok_or_else(|| StorageError::new("spot is not provisioned"))?;
        *stored = spot.clone();
        Ok(())
    }

    async fn get_spot_by_id(
        &self,
        id: parkwise::db::spot::Id,
    ) -> Result<Option<Spot>, StorageError> {
        Ok(self
            .spots
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }
}

pub struct FakeTickets {
    tickets: Mutex<Vec<Ticket>>,
    next_id: AtomicI32,
    pub fail_updates: AtomicBool,
}

impl FakeTickets {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tickets: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(100),
            fail_updates: AtomicBool::new(false),
        })
    }

    pub fn seed(&self, ticket: Ticket) {
        self.tickets.lock().unwrap().push(ticket);
    }

    pub fn get(&self, id: ticket::Id) -> Ticket {
        self.tickets
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .expect("ticket is stored")
            .clone()
    }

    pub fn stored(&self) -> usize {
        self.tickets.lock().unwrap().len()
    }
}

#[async_trait]
impl TicketRepository for FakeTickets {
    async fn has_open_ticket(
        &self,
        vehicle_id: &str,
    ) -> Result<bool, StorageError> {
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .any(|t| t.vehicle_id == vehicle_id && t.is_open()))
    }

    async fn save_ticket(
        &self,
        ticket: &Ticket,
    ) -> Result<ticket::Id, StorageError> {
        let id = ticket::Id::from(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut stored = ticket.clone();
        stored.id = id;
        self.tickets.lock().unwrap().push(stored);
        Ok(id)
    }

    async fn most_recent_ticket(
        &self,
        vehicle_id: &str,
    ) -> Result<Option<Ticket>, StorageError> {
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.vehicle_id == vehicle_id)
            .max_by_key(|t| t.entry_time)
            .cloned())
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<(), StorageError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StorageError::new("ticket store is down"));
        }

        let mut tickets = self.tickets.lock().unwrap();
        let stored = tickets
            .iter_mut()
            .find(|t| t.id == ticket.id)
            .ok_or_else(|| StorageError::new("ticket is missing"))?;
        stored.price = ticket.price;
        stored.exit_time = ticket.exit_time;
        Ok(())
    }

    async fn count_tickets(
        &self,
        vehicle_id: &str,
    ) -> Result<usize, StorageError> {
        Ok(self
            .tickets
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.vehicle_id == vehicle_id)
            .count())
    }
}

pub fn spot(id: i32, category: Category, available: bool) -> Spot {
    Spot {
        id: id.into(),
        category,
        available,
    }
}

pub fn open_ticket(
    id: i32,
    spot: Spot,
    vehicle_id: &str,
    entered_minutes_ago: i64,
) -> Ticket {
    Ticket {
        id: id.into(),
        spot,
        vehicle_id: vehicle_id.to_string(),
        entry_time: OffsetDateTime::now_utc()
            - Duration::minutes(entered_minutes_ago),
        exit_time: None,
        price: Decimal::ZERO,
    }
}

pub fn closed_ticket(
    id: i32,
    spot: Spot,
    vehicle_id: &str,
    entered_minutes_ago: i64,
) -> Ticket {
    let mut ticket = open_ticket(id, spot, vehicle_id, entered_minutes_ago);
    ticket.exit_time =
        Some(ticket.entry_time + Duration::minutes(entered_minutes_ago / 2));
    ticket.price = Decimal::new(78, 2);
    ticket
}

pub fn parking_service(
    spots: &Arc<FakeSpots>,
    tickets: &Arc<FakeTickets>,
) -> ParkingService {
    ParkingService::new(
        Arc::clone(spots) as Arc<dyn SpotRepository>,
        Arc::clone(tickets) as Arc<dyn TicketRepository>,
        Rates::default(),
    )
}
