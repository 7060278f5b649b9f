use super::error::{ToolError, ToolResult};
use super::scan::{collect_work_items, ensure_exists};
use super::schemas::search_code::{CodeMatch, SearchCodeRequest, SearchCodeResult};
use super::AuditTools;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

pub const DEFAULT_SEARCH_LIMIT: usize = 5;
pub const MAX_SEARCH_LIMIT: usize = 50;
const MAX_SEARCH_FILES: usize = 2000;
/// Only the head of larger files is searched.
const MAX_SEARCH_FILE_BYTES: u64 = 256 * 1024;
const PREVIEW_CHARS: usize = 200;

pub(super) async fn search_code(
    tools: &AuditTools,
    request: SearchCodeRequest,
) -> ToolResult<SearchCodeResult> {
    let query = request.query.trim().to_string();
    let display_path = request.path.trim().to_string();
    let root = PathBuf::from(&display_path);
    ensure_exists(&root).await?;
    let limit = request
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .min(MAX_SEARCH_LIMIT);

    let walk_root = root.clone();
    let mut items = tokio::task::spawn_blocking(move || collect_work_items(&walk_root, None, false))
        .await?
        .map_err(|err| ToolError::io(format!("failed to enumerate {display_path}"), err))?;
    if items.len() > MAX_SEARCH_FILES {
        log::warn!(
            "search_code: {} files under {display_path}, searching the first {MAX_SEARCH_FILES}",
            items.len()
        );
        items.truncate(MAX_SEARCH_FILES);
    }

    let mut files = Vec::with_capacity(items.len());
    let mut previews = Vec::with_capacity(items.len());
    let mut texts = Vec::with_capacity(items.len());
    for item in items {
        match read_head(&item.path, MAX_SEARCH_FILE_BYTES).await {
            Ok(text) => {
                previews.push(preview(&text, &query));
                texts.push(text);
                files.push(item);
            }
            Err(err) => log::debug!("search_code: skipping {}: {err}", item.path.display()),
        }
    }

    let index = tools.similarity().index(texts).await;
    let results = index.search(&query, limit).await;

    let matches = results
        .hits
        .iter()
        .filter_map(|hit| {
            let item = files.get(hit.index)?;
            Some(CodeMatch {
                file_path: item.path.display().to_string(),
                language: item.language.clone(),
                score: hit.score,
                preview: previews.get(hit.index)?.clone(),
            })
        })
        .collect();

    Ok(SearchCodeResult {
        query,
        path: display_path,
        files_considered: files.len(),
        matches,
        ai_mode: results.mode,
    })
}

/// Read at most `limit` bytes of a file as lossy UTF-8.
async fn read_head(path: &Path, limit: u64) -> std::io::Result<String> {
    let file = tokio::fs::File::open(path).await?;
    let mut bytes = Vec::new();
    file.take(limit).read_to_end(&mut bytes).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// First line mentioning any query word, else the first non-blank line.
fn preview(text: &str, query: &str) -> String {
    let words: Vec<String> = query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|word| word.len() > 2)
        .collect();
    let mut non_blank = text.lines().map(str::trim).filter(|line| !line.is_empty());
    let first = non_blank.clone().next().unwrap_or_default();
    let line = non_blank
        .find(|line| {
            let lower = line.to_lowercase();
            words.iter().any(|word| lower.contains(word.as_str()))
        })
        .unwrap_or(first);
    line.chars().take(PREVIEW_CHARS).collect()
}
