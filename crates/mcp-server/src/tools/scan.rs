//! Batch indexing: enumerate eligible files, then index them concurrently under a bound.

use super::error::{ToolError, ToolResult};
use super::schemas::scan::{ItemResult, ScanRequest, ScanResult, ScanTotals};
use super::AuditTools;
use audit_engine::proto::BuildIndexRequest;
use audit_engine::{EngineClient, Language};
use audit_protocol::ErrorKind;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::WalkDir;

const UNKNOWN_LANGUAGE: &str = "unknown";

/// One file to index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub path: PathBuf,
    pub language: String,
    pub incremental: bool,
}

impl ItemResult {
    pub(crate) fn failed(
        item: &WorkItem,
        message: impl Into<String>,
        kind: Option<ErrorKind>,
    ) -> Self {
        Self {
            file_path: item.path.display().to_string(),
            language: item.language.clone(),
            indexed: false,
            functions_indexed: 0,
            classes_indexed: 0,
            variables_indexed: 0,
            index_id: None,
            error: Some(message.into()),
            error_kind: kind,
        }
    }
}

/// Enumerate the work items under `root`.
///
/// A file is always its own single item. Inside a directory only files whose extension maps to
/// a known language are eligible; symlinks are not followed. Items come back sorted by path.
pub fn collect_work_items(
    root: &Path,
    language_override: Option<&str>,
    incremental: bool,
) -> io::Result<Vec<WorkItem>> {
    let language_override = language_override
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_lowercase);

    let metadata = std::fs::metadata(root)?;
    if metadata.is_file() {
        let language = language_override
            .or_else(|| Language::from_path(root).map(|lang| lang.as_str().to_string()))
            .unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string());
        return Ok(vec![WorkItem {
            path: root.to_path_buf(),
            language,
            incremental,
        }]);
    }

    let mut items = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log::debug!("scan: skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(detected) = Language::from_path(entry.path()) else {
            continue;
        };
        let language = language_override
            .clone()
            .unwrap_or_else(|| detected.as_str().to_string());
        items.push(WorkItem {
            path: entry.into_path(),
            language,
            incremental,
        });
    }
    items.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(items)
}

/// Run `op` over every item with at most `concurrency` running at once.
///
/// Returns exactly one [`ItemResult`] per item in completion order. A panicking `op` is
/// recorded as a failed item; it never cancels the other items.
pub async fn fan_out<F, Fut>(items: Vec<WorkItem>, concurrency: usize, op: F) -> Vec<ItemResult>
where
    F: Fn(WorkItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ItemResult> + Send + 'static,
{
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let op = Arc::new(op);
    let mut tasks = JoinSet::new();

    for item in items {
        let semaphore = Arc::clone(&semaphore);
        let op = Arc::clone(&op);
        tasks.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return ItemResult::failed(&item, "scan cancelled", Some(ErrorKind::Internal))
                }
            };
            let descriptor = item.clone();
            match tokio::spawn(op(item)).await {
                Ok(result) => result,
                Err(err) => ItemResult::failed(
                    &descriptor,
                    format!("indexing task failed: {err}"),
                    Some(ErrorKind::Internal),
                ),
            }
        });
    }

    let mut results = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(err) => log::error!("scan: worker task aborted: {err}"),
        }
    }
    results
}

/// Read one file and index it with the engine.
pub async fn index_file(client: &EngineClient, item: WorkItem) -> ItemResult {
    let content = match tokio::fs::read(&item.path).await {
        Ok(content) => content,
        Err(err) => {
            return ItemResult::failed(
                &item,
                format!("failed to read {}: {err}", item.path.display()),
                Some(ErrorKind::Io),
            )
        }
    };

    let request = BuildIndexRequest {
        file_path: item.path.display().to_string(),
        language: item.language.clone(),
        content,
        incremental: item.incremental,
    };

    match client.build_index(request).await {
        Ok(response) if response.success => ItemResult {
            file_path: item.path.display().to_string(),
            language: item.language,
            indexed: true,
            functions_indexed: count(response.functions_indexed),
            classes_indexed: count(response.classes_indexed),
            variables_indexed: count(response.variables_indexed),
            index_id: Some(response.index_id).filter(|id| !id.is_empty()),
            error: None,
            error_kind: None,
        },
        Ok(response) => {
            let message = if response.error_message.trim().is_empty() {
                "engine reported an indexing failure".to_string()
            } else {
                response.error_message
            };
            ItemResult::failed(&item, message, Some(ErrorKind::RemoteCallFailed))
        }
        Err(err) => {
            let kind = if err.is_unavailable() {
                ErrorKind::ConnectionUnavailable
            } else {
                ErrorKind::RemoteCallFailed
            };
            ItemResult::failed(&item, err.to_string(), Some(kind))
        }
    }
}

pub(crate) fn count(value: i32) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl ScanResult {
    fn from_results(path: String, results: Vec<ItemResult>, elapsed_ms: u64) -> Self {
        let mut totals = ScanTotals::default();
        let mut successes = 0;
        for result in results.iter().filter(|result| result.indexed) {
            successes += 1;
            totals.functions += result.functions_indexed;
            totals.classes += result.classes_indexed;
            totals.variables += result.variables_indexed;
        }
        let files_scanned = results.len();
        Self {
            message: format!("Indexed {successes} of {files_scanned} files under {path}"),
            path,
            files_scanned,
            successes,
            failures: files_scanned - successes,
            totals,
            results,
            elapsed_ms,
        }
    }

    fn empty(path: String, elapsed_ms: u64) -> Self {
        Self {
            message: format!("No source files found under {path}"),
            path,
            files_scanned: 0,
            successes: 0,
            failures: 0,
            totals: ScanTotals::default(),
            results: Vec::new(),
            elapsed_ms,
        }
    }
}

pub(super) async fn scan(tools: &AuditTools, request: ScanRequest) -> ToolResult<ScanResult> {
    let started = Instant::now();
    let display_path = request.path.trim().to_string();
    let root = PathBuf::from(&display_path);
    ensure_exists(&root).await?;

    let incremental = request.incremental.unwrap_or(true);
    let walk_root = root.clone();
    let items = tokio::task::spawn_blocking(move || {
        collect_work_items(&walk_root, request.language.as_deref(), incremental)
    })
    .await?
    .map_err(|err| ToolError::io(format!("failed to enumerate {display_path}"), err))?;

    if items.is_empty() {
        log::info!("scan: no source files under {display_path}");
        return Ok(ScanResult::empty(display_path, elapsed_ms(started)));
    }

    let client = tools.engine_client()?;
    let concurrency = tools.config().scan_concurrency;
    log::info!(
        "scan: indexing {} file(s) under {display_path} (concurrency {concurrency})",
        items.len()
    );
    let results = fan_out(items, concurrency, move |item| {
        let client = client.clone();
        async move { index_file(&client, item).await }
    })
    .await;

    Ok(ScanResult::from_results(
        display_path,
        results,
        elapsed_ms(started),
    ))
}

/// Fail with `invalid_argument` when `path` does not exist.
pub(super) async fn ensure_exists(path: &Path) -> ToolResult<()> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(ToolError::invalid(format!(
            "path does not exist: {}",
            path.display()
        ))),
        Err(err) => Err(ToolError::io(
            format!("failed to inspect {}", path.display()),
            err,
        )),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
