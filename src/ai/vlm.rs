//! 视觉语言模型 (VLM) 分析模块
//!
//! 使用 OpenAI 兼容 API 对天线照片做状态判读。
//! 支持本地服务（Ollama、vLLM、LM Studio）和远程服务（OpenAI、Together AI、OpenRouter 等）。

use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capture::CapturedImage;

/// 固定的分析指令（泰语）
///
/// 回复文本中的状态字面量是下游分类的依据，不可改动。
const ANALYSIS_PROMPT: &str = "วิเคราะห์ภาพถ่ายสายอากาศนี้ และระบุสถานะว่าเป็น 'ปกติ', 'เกิด Flashover', หรือ 'แตกหัก' โปรดตอบกลับด้วยสถานะและคำอธิบายสั้นๆ";

/// VLM 调用错误
#[derive(Debug, Error)]
pub enum VlmError {
    /// 网络或协议层失败
    #[error("VLM request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// 端点返回非成功状态
    #[error("VLM endpoint error {status}: {body}")]
    Endpoint { status: u16, body: String },
    /// 响应中没有文本内容
    #[error("no text response from VLM endpoint")]
    EmptyResponse,
}

/// VLM 引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlmConfig {
    /// API 端点（如 http://localhost:11434/v1 或 https://api.openai.com/v1）
    pub endpoint: String,
    /// 模型名称（如 qwen3-vl:4b 或 gpt-4o）
    pub model: String,
    /// API 密钥
    #[serde(default)]
    pub api_key: Option<String>,
    /// 最大输出 tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// 温度参数
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.3
}

impl Default for VlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434/v1".to_string(),
            model: "qwen3-vl:4b".to_string(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl VlmConfig {
    /// 创建 Ollama 配置
    pub fn ollama(model: &str) -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434/v1".to_string(),
            model: model.to_string(),
            api_key: None,
            ..Default::default()
        }
    }

    /// 创建 OpenAI 配置
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: model.to_string(),
            api_key: Some(api_key.to_string()),
            ..Default::default()
        }
    }

    /// 创建自定义端点配置
    pub fn custom(endpoint: &str, model: &str, api_key: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.map(|s| s.to_string()),
            ..Default::default()
        }
    }
}

/// VLM 引擎
///
/// 每次分析只发出一次尽力而为的调用，不重试、不缓存。
pub struct VlmEngine {
    config: VlmConfig,
    client: reqwest::Client,
}

impl VlmEngine {
    /// 创建新的 VLM 引擎
    pub fn new(config: VlmConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// 分析天线照片，返回模型的自由文本回复
    pub async fn analyze_image(&self, image: &CapturedImage) -> Result<String, VlmError> {
        let request = self.build_request(image);
        let url = format!("{}/chat/completions", self.config.endpoint);

        info!(
            "VLM API Request: endpoint={}, model={}, mime={}, image_size={}KB",
            self.config.endpoint,
            self.config.model,
            image.mime_type(),
            image.base64().len() / 1024
        );
        debug!("VLM API URL: {}", url);

        let start_time = Instant::now();

        let mut req = self.client.post(&url).json(&request);

        if let Some(ref key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
            debug!("VLM API: Using API key ({}...)", &key[..key.len().min(8)]);
        }

        let response = req.send().await?;
        let status = response.status();

        info!(
            "VLM API Response: status={}, elapsed={:.2}s",
            status,
            start_time.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("VLM API Error: status={}, body={}", status, body);
            return Err(VlmError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;

        if let Some(usage) = body.get("usage") {
            info!(
                "VLM API Usage: prompt_tokens={}, completion_tokens={}, total_tokens={}",
                usage.get("prompt_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("completion_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("total_tokens").and_then(|v| v.as_i64()).unwrap_or(0)
            );
        }

        Self::extract_text(&body)
    }

    /// 构造 chat/completions 请求体，图片以 data-URL 形式内联
    fn build_request(&self, image: &CapturedImage) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": ANALYSIS_PROMPT
                    },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:{};base64,{}", image.mime_type(), image.base64())
                        }
                    }
                ]
            }],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature
        })
    }

    /// 从响应体中取出文本内容，缺失或为空视为调用失败
    fn extract_text(body: &serde_json::Value) -> Result<String, VlmError> {
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim();

        if content.is_empty() {
            return Err(VlmError::EmptyResponse);
        }

        debug!("VLM API Response content length: {} chars", content.len());
        Ok(content.to_string())
    }

    /// 获取后端名称
    pub fn backend_name(&self) -> String {
        if self.config.endpoint.contains("openai.com") {
            "OpenAI".to_string()
        } else if self.config.endpoint.contains("11434") {
            "Ollama".to_string()
        } else if self.config.endpoint.contains("8000") {
            "vLLM".to_string()
        } else {
            format!("Custom ({})", self.config.endpoint)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text() {
        let body = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "สถานะ: ปกติ ไม่พบความเสียหาย"
                }
            }],
            "usage": { "total_tokens": 42 }
        });

        let text = VlmEngine::extract_text(&body).unwrap();
        assert_eq!(text, "สถานะ: ปกติ ไม่พบความเสียหาย");
    }

    #[test]
    fn test_extract_text_missing_field() {
        let body = serde_json::json!({ "choices": [] });
        let err = VlmEngine::extract_text(&body).unwrap_err();
        assert!(matches!(err, VlmError::EmptyResponse));
    }

    #[test]
    fn test_extract_text_blank_content() {
        let body = serde_json::json!({
            "choices": [{ "message": { "content": "   " } }]
        });
        let err = VlmEngine::extract_text(&body).unwrap_err();
        assert!(matches!(err, VlmError::EmptyResponse));
    }

    #[test]
    fn test_build_request_shape() {
        let engine = VlmEngine::new(VlmConfig::default());
        let image = crate::capture::CapturedImage::from_bytes(test_png()).unwrap();

        let request = engine.build_request(&image);

        assert_eq!(request["model"], "qwen3-vl:4b");
        assert_eq!(request["messages"][0]["role"], "user");
        assert_eq!(request["messages"][0]["content"][0]["text"], ANALYSIS_PROMPT);

        let url = request["messages"][0]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(url.ends_with(image.base64()));
    }

    #[test]
    fn test_config_presets() {
        let ollama = VlmConfig::ollama("qwen3-vl:4b");
        assert!(ollama.endpoint.contains("11434"));
        assert!(ollama.api_key.is_none());

        let openai = VlmConfig::openai("sk-test", "gpt-4o");
        assert!(openai.endpoint.contains("openai.com"));
        assert!(openai.api_key.is_some());
    }

    #[test]
    fn test_config_serialization() {
        let config = VlmConfig::openai("sk-test", "gpt-4o");
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: VlmConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model, config.model);
    }

    fn test_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([128, 128, 128]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }
}
