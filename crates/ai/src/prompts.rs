use serde::Serialize;

/// System/user prompt pair sent to the generative engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

const POC_SYSTEM: &str =
    "You are a senior security researcher who writes minimal, reproducible proof-of-concept code.";

const EXPLAIN_SYSTEM: &str =
    "You are a senior code auditor focused on security and maintainability analysis.";

pub fn poc_prompt(vulnerability_id: &str, language: &str, context: Option<&str>) -> PromptPair {
    let mut user = format!(
        "Write a minimal, reproducible {language} proof of concept for vulnerability {vulnerability_id}.\n"
    );
    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        user.push_str("Take the following code into account:\n");
        user.push_str(context);
        user.push('\n');
    }
    user.push_str(
        "Requirements:\n\
         - Reproduce the trigger path with as little code as possible\n\
         - List the steps and dependencies needed to run it\n\
         - Do not include destructive operations; only demonstrate the trigger\n\
         - Mark sources, sinks and sanitizers for any external input or output\n",
    );
    PromptPair {
        system: POC_SYSTEM.to_string(),
        user,
    }
}

pub fn explain_prompt(code: &str, language: Option<&str>) -> PromptPair {
    let subject = language
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!("{l} code"))
        .unwrap_or_else(|| "code".to_string());
    let user = format!(
        "Explain the following {subject} in a concise, structured way:\n\n{code}\n\n\
         Requirements:\n\
         - Summarize the module's responsibility, key functions and data structures\n\
         - Point out security risks (input validation, command execution, SQL injection, path traversal, XSS)\n\
         - Suggest improvements (bounds checks, sanitization, least privilege, logging and error handling)\n\
         - If the code talks to the outside world, describe the data flow (sources, sinks, sanitizers)\n"
    );
    PromptPair {
        system: EXPLAIN_SYSTEM.to_string(),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poc_prompt_names_the_vulnerability_and_language() {
        let prompt = poc_prompt("CVE-2024-1234", "python", Some("  "));
        assert!(prompt.user.contains("CVE-2024-1234"));
        assert!(prompt.user.contains("python proof of concept"));
        assert!(!prompt.user.contains("Take the following code"));
    }

    #[test]
    fn explain_prompt_embeds_the_code() {
        let prompt = explain_prompt("eval(input())", Some("python"));
        assert!(prompt.user.contains("python code"));
        assert!(prompt.user.contains("eval(input())"));
        let untyped = explain_prompt("x", None);
        assert!(untyped.user.starts_with("Explain the following code"));
    }
}
