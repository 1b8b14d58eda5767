//! 분석 프롬프트 생성

use std::collections::BTreeMap;
use std::fmt::Write;

use repowatch_core::types::{ScanResult, Severity, UpdateSeverity};

/// OpenAI 호환 요청의 system 메시지
pub const SYSTEM_PROMPT: &str =
    "You are a security analyst expert. Provide concise, actionable security recommendations.";

/// 스캔 결과 하나로 사용자 프롬프트를 만듭니다.
///
/// 발견 항목 원문은 넣지 않고 개수와 심각도 분포만 요약합니다.
pub fn build_prompt(result: &ScanResult) -> String {
    let mut prompt = String::from(
        "Analyze the following security scan results and provide:\n\
         1. Summary of critical issues\n\
         2. Prioritized recommendations\n\
         3. Risk assessment\n\n\
         Scan Results:\n",
    );
    let _ = writeln!(prompt, "Repository: {}\n", result.repo_name);

    if let Some(scan) = &result.vulnerability_scan {
        prompt.push_str("Vulnerabilities:\n");
        if !scan.dependency_vulnerabilities.is_empty() {
            let _ = writeln!(
                prompt,
                "- Python dependency vulnerabilities: {} found",
                scan.dependency_vulnerabilities.len()
            );
        }
        if !scan.code_issues.is_empty() {
            let _ = writeln!(
                prompt,
                "- Static analysis issues: {} found",
                scan.code_issues.len()
            );
            let mut breakdown: BTreeMap<std::cmp::Reverse<Severity>, usize> = BTreeMap::new();
            for issue in &scan.code_issues {
                *breakdown.entry(std::cmp::Reverse(issue.severity)).or_default() += 1;
            }
            let parts: Vec<_> = breakdown
                .iter()
                .map(|(sev, count)| format!("{}: {count}", sev.0))
                .collect();
            let _ = writeln!(prompt, "  Severity breakdown: {}", parts.join(", "));
        }
        if !scan.common_issues.is_empty() {
            let _ = writeln!(
                prompt,
                "- Common security issues: {} found",
                scan.common_issues.len()
            );
        }
        if scan.total_findings() == 0 {
            prompt.push_str("- No findings reported\n");
        }
    }

    if let Some(check) = result.drupal_check.as_ref().filter(|c| c.is_drupal) {
        prompt.push_str("\nDrupal Analysis:\n");
        let _ = writeln!(
            prompt,
            "- Drupal version: {}",
            check.drupal_version.as_deref().unwrap_or("unknown")
        );
        let _ = writeln!(prompt, "- Total modules: {}", check.module_count());

        let outdated = check.outdated();
        if !outdated.is_empty() {
            let _ = writeln!(prompt, "- Outdated modules: {}", outdated.len());
            for severity in [UpdateSeverity::Major, UpdateSeverity::Minor, UpdateSeverity::Patch] {
                let count = outdated.iter().filter(|m| m.severity == severity).count();
                if count > 0 {
                    let _ = writeln!(
                        prompt,
                        "  {}: {count} modules",
                        severity.to_string().to_uppercase()
                    );
                }
            }
        }
    }

    prompt.push_str("\nProvide a concise security analysis and recommendations.");
    prompt
}
