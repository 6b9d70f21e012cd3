//! 核心编排层：连通监测、分析会话、增量渲染、归档同步、主控循环

pub mod archive;
pub mod controller;
pub mod error;
pub mod liveness;
pub mod reveal;
pub mod session;
pub mod state;

pub use archive::{normalize_record, ArchiveSync, HistoryRecord};
pub use controller::{create_backend, spawn_controller, Command};
pub use error::AnalysisError;
pub use liveness::{ConnectionMonitor, Liveness, LivenessHandle, PollGuard};
pub use reveal::{RenderState, Revealer};
pub use session::{AnalysisRequest, AnalysisSession, AnalysisSuccess};
pub use state::{SessionPhase, Tab, UiState};
