pub mod account;
pub mod balance;
pub mod network;

pub use account::AccountIdentifier;
pub use balance::{AggregateResponse, BalanceResult};
pub use network::{NetworkEndpoint, NetworkRegistry};
