//! 分析会话模块
//!
//! 用单一枚举状态机承载 选图 → 分析 → 结果 的流程，
//! 从结构上排除"同时处于加载中和已出错"这类组合。

mod status;

pub use status::{classify, StatusIcon, MARKER_CRACKED, MARKER_FLASHOVER, MARKER_NORMAL};

use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::ai::vlm::{VlmEngine, VlmError};
use crate::capture::{CaptureError, CapturedImage};

/// 会话层错误
///
/// Display 即用户可见的提示文案。只有"选择了非图片文件"有专属消息；
/// 文件读取失败和远端失败折叠为同一条通用消息，不向用户区分细节。
#[derive(Debug, Error)]
pub enum SessionError {
    /// 选择的内容不是图片，在任何编码或网络动作之前拦截
    #[error("Please upload a valid image file.")]
    InvalidInput(#[source] CaptureError),
    /// 尚未选择图片就触发分析
    #[error("Please upload an image first.")]
    NoImage,
    /// 文件读取失败，与远端失败共用通用消息
    #[error("An error occurred during analysis. Please try again.")]
    EncodingFailed(#[source] CaptureError),
    /// 远端分析失败
    #[error("An error occurred during analysis. Please try again.")]
    AnalysisFailed(#[source] VlmError),
}

/// 会话状态
///
/// 任一时刻只有一个变体成立，图片随状态一起流转。
#[derive(Debug, Clone)]
pub enum SessionState {
    /// 未选择图片
    Idle,
    /// 已选择图片，等待分析
    Ready(CapturedImage),
    /// 分析请求进行中
    Loading(CapturedImage),
    /// 分析成功，携带回复文本
    Succeeded(CapturedImage, String),
    /// 分析失败，携带用户可见的错误消息
    Failed(CapturedImage, String),
}

/// 分析会话
pub struct AnalysisSession {
    state: SessionState,
}

impl AnalysisSession {
    /// 创建空会话
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    /// 当前状态
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// 当前图片（任何非 Idle 状态都持有）
    pub fn image(&self) -> Option<&CapturedImage> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Ready(img)
            | SessionState::Loading(img)
            | SessionState::Succeeded(img, _)
            | SessionState::Failed(img, _) => Some(img),
        }
    }

    /// 分析结果文本
    pub fn result(&self) -> Option<&str> {
        match &self.state {
            SessionState::Succeeded(_, text) => Some(text),
            _ => None,
        }
    }

    /// 用户可见的错误消息
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed(_, message) => Some(message),
            _ => None,
        }
    }

    /// 由结果文本派生的状态图标
    pub fn icon(&self) -> Option<StatusIcon> {
        self.result().and_then(classify)
    }

    /// 选择一张图片
    ///
    /// 成功则进入 Ready 并丢弃之前的结果或错误，失败时会话状态保持不变。
    /// 非图片内容有专属提示，文件读取失败归入通用错误消息。
    pub fn select_image(&mut self, path: &Path) -> Result<(), SessionError> {
        match CapturedImage::from_path(path) {
            Ok(image) => {
                info!(
                    "Image selected: {} {}x{} ({} bytes)",
                    image.mime_type(),
                    image.width(),
                    image.height(),
                    image.size_bytes()
                );
                self.state = SessionState::Ready(image);
                Ok(())
            }
            Err(e) => {
                warn!("Rejected image selection: {}", e);
                match e {
                    CaptureError::Unreadable(_) => Err(SessionError::EncodingFailed(e)),
                    CaptureError::NotAnImage | CaptureError::Decode(_) => {
                        Err(SessionError::InvalidInput(e))
                    }
                }
            }
        }
    }

    /// 移除当前图片，图片、预览、结果和错误一并复位
    pub fn clear(&mut self) {
        self.state = SessionState::Idle;
    }

    /// 对当前图片发起一次分析
    ///
    /// 编码在请求发出前已完成；调用期间处于 Loading，
    /// 结束后进入 Succeeded 或 Failed。没有图片时不发请求。
    pub async fn analyze(&mut self, engine: &VlmEngine) -> Result<String, SessionError> {
        let image = match &self.state {
            SessionState::Idle => return Err(SessionError::NoImage),
            SessionState::Ready(img)
            | SessionState::Loading(img)
            | SessionState::Succeeded(img, _)
            | SessionState::Failed(img, _) => img.clone(),
        };

        self.state = SessionState::Loading(image.clone());

        match engine.analyze_image(&image).await {
            Ok(text) => {
                info!("Analysis succeeded ({} chars)", text.len());
                self.state = SessionState::Succeeded(image, text.clone());
                Ok(text)
            }
            Err(e) => {
                warn!("Analysis failed: {}", e);
                let err = SessionError::AnalysisFailed(e);
                self.state = SessionState::Failed(image, err.to_string());
                Err(err)
            }
        }
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}
