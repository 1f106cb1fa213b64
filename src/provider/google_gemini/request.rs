use crate::error::LLMError;
use crate::types::{CallParams, Role};

use super::types::{GeminiContent, GeminiGenerationConfig, GeminiPart, GeminiRequestBody};

/// 构建 Google Gemini streamGenerateContent 请求体
///
/// 与 OpenAI Chat 不同，Gemini 使用路径参数携带模型名称，system 消息折叠为
/// `system_instruction`，assistant 角色改名为 `model`。
pub(crate) fn build_gemini_body(params: &CallParams) -> Result<GeminiRequestBody, LLMError> {
    let mut system_texts = Vec::new();
    let mut contents = Vec::new();
    for message in &params.messages {
        let role = match message.role {
            Role::System => {
                system_texts.push(message.content.clone());
                continue;
            }
            Role::User => "user",
            Role::Assistant => "model",
        };
        contents.push(GeminiContent {
            role: Some(role.to_string()),
            parts: vec![text_part(&message.content)],
        });
    }

    if contents.is_empty() {
        return Err(LLMError::Validation {
            message: "Gemini request requires at least one user or assistant message".to_string(),
        });
    }

    // 多条 system 消息拼接为单条说明
    let system_instruction = (!system_texts.is_empty()).then(|| GeminiContent {
        role: None,
        parts: vec![text_part(&system_texts.join("\n\n"))],
    });

    let generation_config = (params.temperature.is_some() || params.max_tokens.is_some()).then(|| {
        GeminiGenerationConfig {
            temperature: params.temperature,
            max_output_tokens: params.max_tokens,
        }
    });

    Ok(GeminiRequestBody {
        contents,
        system_instruction,
        generation_config,
    })
}

fn text_part(text: &str) -> GeminiPart {
    GeminiPart {
        text: Some(text.to_string()),
    }
}
