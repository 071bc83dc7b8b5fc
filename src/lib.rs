// Library surface for the CLI and integration tests.
pub mod attempt;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod progress;
pub mod reducer;
pub mod service;
pub mod store;

pub use error::{PracticeError, Result};
pub use geometry::Point;
pub use service::{PracticeService, StrokeSubmission, SubmissionReceipt};
