use serde::{Deserialize, Serialize};

/// streamGenerateContent 请求体
#[derive(Debug, Serialize)]
pub(crate) struct GeminiRequestBody {
    pub(crate) contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub(crate) generation_config: Option<GeminiGenerationConfig>,
}

/// 采样配置
#[derive(Debug, Default, Serialize)]
pub(crate) struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    pub(crate) max_output_tokens: Option<u32>,
}

/// 流式 chunk 顶层结构
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiStreamChunk {
    /// 候选回答列表
    #[serde(default)]
    pub(crate) candidates: Vec<GeminiCandidate>,
    /// token 用量元信息
    #[serde(default, rename = "usageMetadata")]
    pub(crate) usage_metadata: Option<GeminiUsageMetadata>,
}

/// 单个候选回答
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiCandidate {
    #[serde(default)]
    pub(crate) content: Option<GeminiContent>,
    #[serde(default)]
    pub(crate) index: Option<usize>,
}

/// 内容，请求与响应共用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) role: Option<String>,
    #[serde(default)]
    pub(crate) parts: Vec<GeminiPart>,
}

/// Content.part，这里只用到纯文本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
}

/// usageMetadata
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiUsageMetadata {
    #[serde(default, rename = "promptTokenCount")]
    pub(crate) prompt_token_count: Option<u64>,
    #[serde(default, rename = "candidatesTokenCount")]
    pub(crate) candidates_token_count: Option<u64>,
    #[serde(default, rename = "totalTokenCount")]
    pub(crate) total_token_count: Option<u64>,
}
