pub mod artifact;
pub mod audit;
pub mod booking;
pub mod inventory;
pub mod layout;
