//! Deck Analyzer
//!
//! Analysis engine for Commander deck lists.
//!
//! This library provides:
//! - `resolver`: Fuzzy card-name resolution with a success-only cache
//! - `tags`: Paginated, process-wide classification sets (ramp, removal, ...)
//! - `combos`: Two-card combo index and per-deck combo detection
//! - `analyzers`: The individual deck metrics
//! - `engine`: Orchestration of a full analysis request
//! - `server`: The `POST /analyzeDeck` HTTP surface
//!
//! Binaries:
//! - `deck-analyzer`: HTTP analysis service
//! - `deck-report`: Analyze a deck list file from the command line

pub mod analyzers;
pub mod card;
pub mod combos;
pub mod engine;
pub mod error;
pub mod resolver;
pub mod server;
pub mod tags;
pub mod upstream;

pub use card::Card;
pub use engine::{DeckAnalysis, DeckAnalyzer, EngineConfig};
pub use error::{Error, Result};
