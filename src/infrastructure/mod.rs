pub mod logging;
pub mod solana_rpc;
