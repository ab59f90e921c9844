//! turncoder - Statistics engine for manually coded parent-child communication
//!
//! Annotators watch a recorded interaction, mark each communicative turn and
//! classify it against a fixed coding scheme. turncoder turns those coded
//! turns into interaction statistics through a deterministic pipeline:
//! session parsing → validation → turn ordering → aggregation → report encoding.
//!
//! ## Modules
//!
//! - **Coding Scheme**: Static registry of labels, strategies and their parental styles
//! - **Aggregator**: Turn-taking, eye-contact and parental-style statistics
//! - **Session**: Saved session files and the ordered turn log

pub mod encoder;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod scheme;
pub mod session;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use error::CodingError;
pub use features::{compute_statistics, StatisticsAggregator};
pub use pipeline::{
    session_to_statistics, session_to_statistics_text, session_to_turn_report, CodingProcessor,
};
pub use session::{parse_session, SessionFile, TurnLog};

// Scheme exports
pub use scheme::{list_strategies, style_tags_for, SCHEME_VERSION};

/// Engine version embedded in all statistics reports
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for statistics reports
pub const PRODUCER_NAME: &str = "turncoder";
