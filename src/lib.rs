//! Dipole - VLM-powered antenna condition analyzer
//!
//! 核心库，提供图片读取与 base64 编码、VLM 分析调用和结果状态分类功能。

pub mod ai;
pub mod capture;
pub mod config;
pub mod session;

pub use ai::{VlmConfig, VlmEngine, VlmError};
pub use capture::{CaptureError, CapturedImage};
pub use config::AppConfig;
pub use session::{classify, AnalysisSession, SessionError, SessionState, StatusIcon};
