//! AI 推理模块
//!
//! 封装对 OpenAI 兼容视觉语言模型 (VLM) 端点的单次分析调用。

pub mod vlm;

pub use vlm::{VlmConfig, VlmEngine, VlmError};
