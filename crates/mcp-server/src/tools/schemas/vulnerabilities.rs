use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct SearchVulnerabilitiesRequest {
    #[schemars(description = "Package name as published in its ecosystem")]
    pub package_name: String,

    #[schemars(description = "Package version; omit to list advisories for every version")]
    pub version: Option<String>,

    #[schemars(description = "Package ecosystem, e.g. PyPI, npm, Go, crates.io (default: PyPI)")]
    pub ecosystem: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisoryRecord {
    pub id: String,
    pub summary: String,
    pub aliases: Vec<String>,
    pub severity: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VulnerabilitiesResult {
    pub package_name: String,
    pub ecosystem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub vulnerabilities: Vec<AdvisoryRecord>,
    pub total: usize,
}
