pub mod spot;
pub mod ticket;

pub use self::{spot::Spot, ticket::Ticket};
