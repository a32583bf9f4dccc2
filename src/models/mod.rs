pub mod user;
pub mod event;
pub mod seat;
pub mod ticket;
pub mod promo_code;
pub mod action_log;

pub use user::User;
pub use event::Event;
pub use seat::Seat;
pub use ticket::Ticket;
pub use promo_code::PromoCode;
pub use action_log::ActionLog;
