//! API 层：审计服务客户端抽象与实现（HTTP / Mock）

pub mod backend;
pub mod http;
pub mod mock;

pub use backend::{AnalysisBackend, RawResponse};
pub use http::HttpBackend;
pub use mock::MockBackend;
