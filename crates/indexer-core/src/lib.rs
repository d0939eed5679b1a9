//! The indexer binary's library surface: factories (B), the event
//! processor (H, including R1/R2 expansion), the backfill worker (F), the
//! realtime worker (G), boot/lifecycle (J), and CLI configuration.

pub mod backfill;
pub mod config;
pub mod factories;
pub mod processor;
pub mod realtime;
pub mod runtime;
