use super::error::ToolResult;
use super::schemas::poc::{GeneratePocRequest, PocResult};
use super::AuditTools;
use audit_ai::prompts::poc_prompt;
use audit_ai::AnswerMode;

pub const DEFAULT_POC_LANGUAGE: &str = "python";
const POC_MAX_TOKENS: u32 = 800;

pub(super) async fn generate_poc(
    tools: &AuditTools,
    request: GeneratePocRequest,
) -> ToolResult<PocResult> {
    let vulnerability_id = request.vulnerability_id.trim().to_string();
    let language = request
        .language
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty())
        .unwrap_or_else(|| DEFAULT_POC_LANGUAGE.to_string());

    let prompt = poc_prompt(&vulnerability_id, &language, request.context.as_deref());
    let answer = tools
        .generator()
        .ask(&prompt.system, &prompt.user, POC_MAX_TOKENS)
        .await;

    Ok(PocResult {
        vulnerability_id,
        language,
        poc: answer.text,
        ai_mode: answer.mode,
        model: answer.model,
        llm_prompt: (answer.mode == AnswerMode::Heuristic).then_some(prompt),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use audit_ai::{SimilarityBackend, TextGenerator};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn heuristic_answer_carries_the_prompt_for_the_host() {
        let tools = AuditTools::with_backends(
            AuditConfig::default(),
            TextGenerator::unavailable("test"),
            SimilarityBackend::unavailable("test"),
        );
        let result = generate_poc(
            &tools,
            GeneratePocRequest {
                vulnerability_id: " CVE-2021-44228 ".to_string(),
                language: None,
                context: Some("logger.info(user_input)".to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(result.vulnerability_id, "CVE-2021-44228");
        assert_eq!(result.language, DEFAULT_POC_LANGUAGE);
        assert_eq!(result.ai_mode, AnswerMode::Heuristic);
        let prompt = result.llm_prompt.expect("prompt for the host");
        assert!(prompt.user.contains("CVE-2021-44228"));
        assert!(prompt.user.contains("logger.info(user_input)"));
        assert!(!prompt.system.is_empty());
    }
}
