//! Live reading-position tracking for re-rendered chapters
//!
//! A chapter view is driven through a [`LayoutOracle`]. The block at the
//! reading edge is turned into debounced saves, and saved positions come back
//! through a tiered cascade that degrades instead of failing.

#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod detector;
pub mod error;
pub mod geometry;
pub mod reconciler;
pub mod restorer;
pub mod retry;
pub mod scheduler;
pub mod session;
pub mod simulated;
pub mod store;

// Re-export key types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use detector::{EdgeReading, PositionDetector, ViewMode};
pub use error::{EngineError, Result};
pub use geometry::{Alignment, LayoutOracle, Rect, VisibilityReport, WritingMode};
pub use reconciler::{LayoutSettings, PageGeometry, PageRelocation, PaginationReconciler, RestoreKey};
pub use restorer::{
    Confidence, Degradation, RelocationStrategy, RestorationResult, RestoreMethod, Restorer,
    ScrollRelocation,
};
pub use retry::{BoundedPoll, PollOutcome};
pub use scheduler::{FlushReason, SaveScheduler};
pub use session::ReadingSession;
pub use simulated::{LayoutMetrics, SimulatedLayout};
pub use store::{JsonFileStore, MemoryStore, PositionStore};

// Re-export from core for convenience
pub use shiori_core::{Position, SegmentedChapter, Segmenter};
