//! Advisory lookup against an OSV-compatible query API.

use super::error::{ToolError, ToolResult};
use super::schemas::vulnerabilities::{
    AdvisoryRecord, SearchVulnerabilitiesRequest, VulnerabilitiesResult,
};
use super::AuditTools;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ECOSYSTEM: &str = "PyPI";
const ADVISORY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AdvisoryClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    package: QueryPackage<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
}

#[derive(Serialize)]
struct QueryPackage<'a> {
    name: &'a str,
    ecosystem: &'a str,
}

#[derive(Deserialize, Default)]
struct QueryResponse {
    #[serde(default)]
    vulns: Vec<OsvVulnerability>,
}

#[derive(Deserialize)]
struct OsvVulnerability {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    severity: Vec<OsvSeverity>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    modified: Option<String>,
}

#[derive(Deserialize)]
struct OsvSeverity {
    #[serde(rename = "type")]
    kind: String,
    score: String,
}

impl From<OsvVulnerability> for AdvisoryRecord {
    fn from(vuln: OsvVulnerability) -> Self {
        let summary = vuln
            .summary
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                vuln.details
                    .as_deref()
                    .and_then(|details| details.lines().find(|line| !line.trim().is_empty()))
                    .map(|line| line.trim().to_string())
            })
            .unwrap_or_default();
        Self {
            id: vuln.id,
            summary,
            aliases: vuln.aliases,
            severity: vuln
                .severity
                .into_iter()
                .map(|sev| format!("{}: {}", sev.kind, sev.score))
                .collect(),
            published: vuln.published,
            modified: vuln.modified,
        }
    }
}

impl AdvisoryClient {
    pub fn new(base_url: &str) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(ADVISORY_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn query(
        &self,
        package_name: &str,
        ecosystem: &str,
        version: Option<&str>,
    ) -> ToolResult<Vec<AdvisoryRecord>> {
        let body = QueryRequest {
            package: QueryPackage {
                name: package_name,
                ecosystem,
            },
            version,
        };
        let response = self
            .client
            .post(format!("{}/v1/query", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|err| ToolError::AdvisoryUnavailable(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ToolError::AdvisoryUnavailable(err.to_string()))?;
        if !status.is_success() {
            return Err(ToolError::Remote(format!(
                "advisory query failed with HTTP {status}: {}",
                text.chars().take(300).collect::<String>()
            )));
        }
        parse_advisories(&text)
    }
}

fn parse_advisories(body: &str) -> ToolResult<Vec<AdvisoryRecord>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: QueryResponse = serde_json::from_str(body)
        .map_err(|err| ToolError::Remote(format!("malformed advisory response: {err}")))?;
    Ok(parsed.vulns.into_iter().map(AdvisoryRecord::from).collect())
}

pub(super) async fn search_vulnerabilities(
    tools: &AuditTools,
    request: SearchVulnerabilitiesRequest,
) -> ToolResult<VulnerabilitiesResult> {
    let client = tools.advisories().ok_or_else(|| {
        ToolError::AdvisoryUnavailable("advisory HTTP client could not be created".to_string())
    })?;

    let package_name = request.package_name.trim().to_string();
    let ecosystem = request
        .ecosystem
        .map(|eco| eco.trim().to_string())
        .filter(|eco| !eco.is_empty())
        .unwrap_or_else(|| DEFAULT_ECOSYSTEM.to_string());
    let version = request
        .version
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let vulnerabilities = client
        .query(&package_name, &ecosystem, version.as_deref())
        .await?;
    log::info!(
        "search_vulnerabilities: {} advisories for {ecosystem}/{package_name}",
        vulnerabilities.len()
    );

    Ok(VulnerabilitiesResult {
        total: vulnerabilities.len(),
        package_name,
        ecosystem,
        version,
        vulnerabilities,
    })
}
