use super::error::ToolResult;
use super::schemas::explain::{CodeMetrics, ExplainCodeRequest, ExplainResult};
use super::AuditTools;
use audit_ai::prompts::explain_prompt;
use audit_ai::AnswerMode;

const EXPLAIN_MAX_TOKENS: u32 = 1200;

pub(super) async fn explain_code(
    tools: &AuditTools,
    request: ExplainCodeRequest,
) -> ToolResult<ExplainResult> {
    let metrics = code_metrics(&request.code);
    let prompt = explain_prompt(&request.code, request.language.as_deref());
    let answer = tools
        .generator()
        .ask(&prompt.system, &prompt.user, EXPLAIN_MAX_TOKENS)
        .await;

    Ok(ExplainResult {
        explanation: answer.text,
        metrics,
        ai_mode: answer.mode,
        model: answer.model,
        llm_prompt: (answer.mode == AnswerMode::Heuristic).then_some(prompt),
    })
}

/// Line statistics of the trimmed code.
pub fn code_metrics(code: &str) -> CodeMetrics {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return CodeMetrics {
            lines: 0,
            non_empty: 0,
            avg_length: 0.0,
        };
    }
    let lines: Vec<&str> = trimmed.lines().collect();
    let non_empty = lines.iter().filter(|line| !line.trim().is_empty()).count();
    let total_chars: usize = lines.iter().map(|line| line.chars().count()).sum();
    CodeMetrics {
        lines: lines.len(),
        non_empty,
        avg_length: total_chars as f64 / lines.len() as f64,
    }
}
