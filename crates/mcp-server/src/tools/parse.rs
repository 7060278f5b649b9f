use super::error::{ToolError, ToolResult};
use super::scan::{count, ensure_exists};
use super::schemas::parse::{ParseFileRequest, ParseResult};
use super::AuditTools;
use audit_engine::proto::ParseRequest;
use audit_engine::Language;
use std::path::PathBuf;

pub(super) async fn parse_file(
    tools: &AuditTools,
    request: ParseFileRequest,
) -> ToolResult<ParseResult> {
    let path = PathBuf::from(request.path.trim());
    ensure_exists(&path).await?;
    if !path.is_file() {
        return Err(ToolError::invalid(format!(
            "parse_file expects a file, got directory {}",
            path.display()
        )));
    }

    let language = request
        .language
        .map(|lang| lang.trim().to_lowercase())
        .filter(|lang| !lang.is_empty())
        .or_else(|| Language::from_path(&path).map(|lang| lang.as_str().to_string()))
        .ok_or_else(|| {
            ToolError::invalid(format!(
                "cannot detect the language of {}; pass `language`",
                path.display()
            ))
        })?;

    let content = tokio::fs::read(&path)
        .await
        .map_err(|err| ToolError::io(format!("failed to read {}", path.display()), err))?;

    let client = tools.engine_client()?;
    let response = client
        .parse_file(ParseRequest {
            file_path: path.display().to_string(),
            language: language.clone(),
            content,
            include_comments: request.include_comments.unwrap_or(false),
        })
        .await?;

    if !response.success {
        let reason = if response.errors.is_empty() {
            "engine could not parse the file".to_string()
        } else {
            response.errors.join("; ")
        };
        return Err(ToolError::Remote(format!(
            "ParseFile {}: {reason}",
            path.display()
        )));
    }

    let metadata = response.metadata.unwrap_or_default();
    Ok(ParseResult {
        file_path: path.display().to_string(),
        language,
        parse_time_ms: metadata.parse_time_ms,
        total_lines: count(metadata.total_lines),
        total_functions: count(metadata.total_functions),
        total_classes: count(metadata.total_classes),
        language_version: metadata.language_version,
        ast_bytes: response.ast_data.len(),
        errors: response.errors,
    })
}
