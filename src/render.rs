//! Plain-text views. Every function here is pure: model in, text out.

use std::fmt::Write;

use reqwest::Url;
use time::{macros::format_description, OffsetDateTime};

use crate::documents::model::{Document, ScoreBand};
use crate::profile::model::UserProfile;

const BAR_WIDTH: usize = 20;

pub fn format_date(at: Option<OffsetDateTime>) -> String {
    at.and_then(|dt| {
        dt.format(format_description!("[day].[month].[year] [hour]:[minute]"))
            .ok()
    })
    .unwrap_or_else(|| "-".into())
}

fn score_label(score: u8) -> String {
    format!("{}/100 ({})", score, ScoreBand::for_score(score).label())
}

/// Resolves a media path from the backend against the API host.
pub fn file_link(base_url: &str, path: &str) -> String {
    Url::parse(base_url)
        .and_then(|base| base.join(path))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| path.to_string())
}

/// Full analysis of one document.
///
/// A missing score reads as `0/100`, the same as a failed analysis.
pub fn document_detail(doc: &Document, base_url: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", doc.display_name());
    let _ = writeln!(out, "Uploaded: {}", format_date(doc.uploaded_at));
    let _ = writeln!(out, "Status:   {}", doc.status.label());
    let _ = writeln!(out, "Score:    {}", score_label(doc.score.unwrap_or(0)));
    write_findings(&mut out, doc);

    if doc.file.is_some() || doc.improved_file.is_some() {
        out.push_str("\nFiles\n");
        if let Some(file) = &doc.file {
            let _ = writeln!(out, "  original: {}", file_link(base_url, file));
        }
        if let Some(file) = &doc.improved_file {
            let _ = writeln!(out, "  improved: {}", file_link(base_url, file));
        }
    }
    out
}

/// Inline results for a guest upload. Nothing is stored server-side.
pub fn guest_results(doc: &Document) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Analysis of {}", doc.display_name());
    let _ = writeln!(out, "Score: {}", score_label(doc.score.unwrap_or(0)));
    write_findings(&mut out, doc);
    out.push_str("\nSign up to keep your analyses and download improved contracts.\n");
    out
}

fn write_findings(out: &mut String, doc: &Document) {
    if let Some(summary) = &doc.summary {
        let _ = writeln!(out, "\nSummary\n  {}", summary);
    }

    if !doc.risks.is_empty() {
        out.push_str("\nRisks\n");
        for risk in &doc.risks {
            match &risk.title {
                Some(title) => {
                    let _ = writeln!(out, "  ! {}: {}", title, risk.description);
                }
                None => {
                    let _ = writeln!(out, "  ! {}", risk.description);
                }
            }
        }
    }

    if !doc.recommendations.is_empty() {
        out.push_str("\nRecommendations\n");
        for rec in &doc.recommendations {
            match &rec.title {
                Some(title) => {
                    let _ = writeln!(out, "  - {}: {}", title, rec.description);
                }
                None => {
                    let _ = writeln!(out, "  - {}", rec.description);
                }
            }
            if let Some(example) = &rec.clause_example {
                let _ = writeln!(out, "      e.g. \"{}\"", example);
            }
        }
    }
}

pub fn dashboard(docs: &[Document]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5}  {:<32}  {:<16}  {:<16}  {}",
        "ID", "NAME", "UPLOADED", "SCORE", "STATUS"
    );
    if docs.is_empty() {
        out.push_str("       No documents yet. Upload a contract to get started.\n");
    }
    for doc in docs {
        let id = doc.id.map(|i| i.to_string()).unwrap_or_else(|| "-".into());
        let score = match doc.score.zip(doc.band()) {
            Some((s, band)) => format!("{}/100 ({})", s, band.label()),
            None => "?/100".into(),
        };
        let _ = writeln!(
            out,
            "{:>5}  {:<32}  {:<16}  {:<16}  {}",
            id,
            truncate(doc.display_name(), 32),
            format_date(doc.uploaded_at),
            score,
            doc.status.label()
        );
    }
    let _ = writeln!(out, "\n{} document(s)", docs.len());
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max - 3).collect();
    cut.push_str("...");
    cut
}

pub fn profile(p: &UserProfile) -> String {
    let usage = p.usage();
    let filled = usize::from(usage.percent) * BAR_WIDTH / 100;
    let mut out = String::new();
    let _ = writeln!(out, "{} <{}>", p.username, p.email);
    let _ = writeln!(out, "Plan:   {}", p.subscription_tier.as_str().to_uppercase());
    let _ = writeln!(
        out,
        "Checks: [{}{}] {}/{} remaining ({}%){}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        usage.remaining,
        usage.quota,
        usage.percent,
        if usage.is_low() { "  low" } else { "" }
    );
    let _ = writeln!(out, "Total checks run: {}", p.total_checks_count);
    out
}
