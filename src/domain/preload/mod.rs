//! Preload Context - 预加载票据

mod ticket;

pub use ticket::{PreloadTicket, TicketStatus};
