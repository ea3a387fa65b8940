//! Database query functions organized by domain.

pub mod affiliates;
pub mod conversions;
pub mod credits;
pub mod payouts;
pub mod revenue;
pub mod sessions;
pub mod settings;
pub mod users;
pub mod wallets;
