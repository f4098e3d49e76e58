pub mod clock;
pub mod config;
pub mod error;
pub mod journal;
pub mod llm;
pub mod models;
pub mod review;
pub mod routes;
pub mod session;
pub mod soft_delete;
pub mod staleness;
pub mod state;
pub mod storage;

pub use journal::Journal;
pub use session::DecisionSession;
