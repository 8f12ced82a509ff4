//! Real-time ingestion and analytics pipeline for a Solana bonding-curve /
//! AMM token-launch protocol (see SPEC_FULL.md).
//!
//! Components, leaves first: the price engine (C1) and event parser (C2)
//! are pure/stateless; the subscription manager (C3) and pool state cache
//! (C4) track live chain state; the trade handler (C5) and batching
//! persistence layer (C6) turn events into durable rows; the stale
//! detector (C7), its external price adapters (C8), and the performance
//! monitor (C9) run as independent background services wired together by
//! the composition root in `services`.

pub mod adapter;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod logger;
pub mod monitor;
pub mod parser;
pub mod persistence;
pub mod pool_cache;
pub mod price;
pub mod recovery;
pub mod services;
pub mod stream;
pub mod trade_handler;
