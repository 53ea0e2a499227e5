//! Plain-text rendering of analysis results.

use crate::citations::CitationReport;
use crate::schema::AnalysisResult;
use std::fmt::Write;

pub const PATENTABLE_BADGE: &str = "Likely Patentable";
pub const NOT_PATENTABLE_BADGE: &str = "Not Likely Patentable";

/// Verdict badge for an analysis.
pub fn verdict_label(result: &AnalysisResult) -> &'static str {
    if result.patentability_analysis.is_patentable {
        PATENTABLE_BADGE
    } else {
        NOT_PATENTABLE_BADGE
    }
}

/// Render the full analysis report shown to the user.
pub fn render_report(result: &AnalysisResult) -> String {
    let analysis = &result.patentability_analysis;
    let mut out = String::new();

    let _ = writeln!(out, "Analysis Report");
    let _ = writeln!(out, "[{}]", verdict_label(result));
    let _ = writeln!(out);
    let _ = writeln!(out, "Analysis Summary");
    let _ = writeln!(out, "{}", analysis.analysis_summary.trim());
    let _ = writeln!(out);
    let _ = writeln!(out, "Improvement Suggestions");
    let _ = writeln!(out, "{}", result.improvement_suggestions.trim());

    if !analysis.cited_resources.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Cited Resources");
        for (i, resource) in analysis.cited_resources.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, resource.title);
            let _ = writeln!(out, "   {}", resource.url);
        }
    }
    out
}

/// Render refined suggestions under their own heading.
pub fn render_suggestions(suggestions: &str) -> String {
    format!("Refined Suggestions\n{}\n", suggestions.trim())
}

/// Render a link check report.
pub fn render_citation_report(report: &CitationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Citation Links ({}/{} reachable)",
        report.reachable, report.total
    );
    for check in &report.checks {
        let _ = writeln!(out, "- {} [{}]", check.title, check.status.label());
    }
    out
}

/// Flatten an analysis into the free text the suggestion flow takes as
/// `analysisResults`.
pub fn analysis_to_text(result: &AnalysisResult) -> String {
    let analysis = &result.patentability_analysis;
    let mut out = String::new();
    let _ = writeln!(out, "Verdict: {}", verdict_label(result));
    let _ = writeln!(out, "Summary: {}", analysis.analysis_summary.trim());
    if !analysis.cited_resources.is_empty() {
        let _ = writeln!(out, "Cited Resources:");
        for resource in &analysis.cited_resources {
            let _ = writeln!(out, "- {} ({})", resource.title, resource.url);
        }
    }
    let _ = write!(
        out,
        "Improvement Suggestions: {}",
        result.improvement_suggestions.trim()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::{CitationCheck, LinkStatus};
    use crate::schema::{CitedResource, PatentabilityAnalysis};
    use pretty_assertions::assert_eq;

    fn sample(is_patentable: bool, cited: Vec<CitedResource>) -> AnalysisResult {
        AnalysisResult {
            patentability_analysis: PatentabilityAnalysis {
                is_patentable,
                analysis_summary: "Heated mugs exist. ".to_string(),
                cited_resources: cited,
            },
            improvement_suggestions: "Claim the thermal control loop.".to_string(),
        }
    }

    fn mug_patent() -> CitedResource {
        CitedResource {
            title: "Self-heating mug".to_string(),
            url: "https://patents.google.com/patent/US1234567B2".to_string(),
        }
    }

    #[test]
    fn test_render_report_layout() {
        let text = render_report(&sample(false, vec![mug_patent()]));
        assert_eq!(
            text,
            "Analysis Report\n\
             [Not Likely Patentable]\n\
             \n\
             Analysis Summary\n\
             Heated mugs exist.\n\
             \n\
             Improvement Suggestions\n\
             Claim the thermal control loop.\n\
             \n\
             Cited Resources\n\
             1. Self-heating mug\n   https://patents.google.com/patent/US1234567B2\n"
        );
    }

    #[test]
    fn test_render_report_without_citations() {
        let text = render_report(&sample(true, vec![]));
        assert!(text.contains("[Likely Patentable]"));
        assert!(!text.contains("Cited Resources"));
    }

    #[test]
    fn test_analysis_to_text() {
        let text = analysis_to_text(&sample(false, vec![mug_patent()]));
        assert_eq!(
            text,
            "Verdict: Not Likely Patentable\n\
             Summary: Heated mugs exist.\n\
             Cited Resources:\n\
             - Self-heating mug (https://patents.google.com/patent/US1234567B2)\n\
             Improvement Suggestions: Claim the thermal control loop."
        );
    }

    #[test]
    fn test_render_citation_report() {
        let report = CitationReport {
            checks: vec![CitationCheck {
                title: "Self-heating mug".to_string(),
                url: "https://patents.google.com/patent/US1234567B2".to_string(),
                status: LinkStatus::Reachable { http_status: 200 },
            }],
            reachable: 1,
            total: 1,
        };
        assert_eq!(
            render_citation_report(&report),
            "Citation Links (1/1 reachable)\n- Self-heating mug [ok (200)]\n"
        );
    }
}
