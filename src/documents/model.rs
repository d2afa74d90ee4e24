use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use tracing::warn;

use crate::documents::dto::{DocumentPayload, RawFinding, RawFindings};
use crate::error::ClientError;

/// Analysis state. Only ever moves forward: pending, then processed or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processed,
    Failed,
}

impl DocumentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DocumentStatus::Pending)
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentStatus::Pending => "Processing",
            DocumentStatus::Processed => "Ready",
            DocumentStatus::Failed => "Error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Good,
    Caution,
    Risky,
}

impl ScoreBand {
    pub fn for_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => ScoreBand::Good,
            50..=79 => ScoreBand::Caution,
            _ => ScoreBand::Risky,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Good => "good",
            ScoreBand::Caution => "caution",
            ScoreBand::Risky => "risky",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Risk {
    pub title: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub title: Option<String>,
    pub description: String,
    pub clause_example: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Absent for guest analyses, which are never stored.
    pub id: Option<i64>,
    pub name: Option<String>,
    pub uploaded_at: Option<OffsetDateTime>,
    pub status: DocumentStatus,
    pub score: Option<u8>,
    pub summary: Option<String>,
    pub risks: Vec<Risk>,
    pub recommendations: Vec<Recommendation>,
    pub file: Option<String>,
    pub improved_file: Option<String>,
}

impl Document {
    pub fn band(&self) -> Option<ScoreBand> {
        self.score.map(ScoreBand::for_score)
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("Untitled")
    }
}

impl TryFrom<DocumentPayload> for Document {
    type Error = ClientError;

    fn try_from(p: DocumentPayload) -> Result<Self, Self::Error> {
        let uploaded_at = match p.uploaded_at.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_timestamp(raw).map_err(|e| {
                ClientError::InvalidPayload(format!("uploaded_at {:?}: {}", raw, e))
            })?),
        };

        let score = match p.score {
            None => None,
            Some(s) if (0.0..=100.0).contains(&s) => Some(s.round() as u8),
            Some(s) => {
                return Err(ClientError::InvalidPayload(format!(
                    "score {} outside 0..=100",
                    s
                )))
            }
        };

        let risks = findings(p.risks, "risks")?
            .into_iter()
            .filter_map(|f| match f {
                RawFinding::Text(text) => Some(Risk {
                    title: None,
                    description: text,
                }),
                RawFinding::Item(item) => {
                    let title = item.title.or(item.risk);
                    let description = item.description.or(item.recommendation).unwrap_or_default();
                    if title.is_none() && description.is_empty() {
                        return None;
                    }
                    Some(Risk { title, description })
                }
            })
            .collect();

        let recommendations = findings(p.recommendations, "recommendations")?
            .into_iter()
            .filter_map(|f| match f {
                RawFinding::Text(text) => Some(Recommendation {
                    title: None,
                    description: text,
                    clause_example: None,
                }),
                RawFinding::Item(item) => {
                    let title = item.title;
                    let description = item.description.or(item.recommendation).unwrap_or_default();
                    if title.is_none() && description.is_empty() {
                        return None;
                    }
                    Some(Recommendation {
                        title,
                        description,
                        clause_example: item.clause_example.filter(|c| !c.is_empty()),
                    })
                }
            })
            .collect();

        Ok(Document {
            id: p.id,
            name: p.name,
            uploaded_at,
            status: parse_status(p.status.as_deref()),
            score,
            summary: p.summary.filter(|s| !s.is_empty()),
            risks,
            recommendations,
            file: p.file.filter(|f| !f.is_empty()),
            improved_file: p.improved_file.filter(|f| !f.is_empty()),
        })
    }
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` taken as UTC.
fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    OffsetDateTime::parse(raw, &Rfc3339).or_else(|e| {
        PrimitiveDateTime::parse(
            raw,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
        )
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| e)
    })
}

fn parse_status(raw: Option<&str>) -> DocumentStatus {
    match raw {
        // `/analyze/` answers synchronously and carries no status.
        None => DocumentStatus::Processed,
        Some(s) if s.eq_ignore_ascii_case("pending") => DocumentStatus::Pending,
        Some(s) if s.eq_ignore_ascii_case("processed") => DocumentStatus::Processed,
        Some(s) if s.eq_ignore_ascii_case("failed") => DocumentStatus::Failed,
        Some(other) => {
            warn!(status = other, "unknown document status, showing as processing");
            DocumentStatus::Pending
        }
    }
}

fn findings(raw: Option<RawFindings>, field: &str) -> Result<Vec<RawFinding>, ClientError> {
    match raw {
        None => Ok(Vec::new()),
        Some(RawFindings::List(items)) => Ok(items),
        Some(RawFindings::Encoded(text)) if text.trim().is_empty() => Ok(Vec::new()),
        Some(RawFindings::Encoded(text)) => serde_json::from_str(&text).map_err(|e| {
            ClientError::InvalidPayload(format!("{} is a string but not a JSON list: {}", field, e))
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(v: serde_json::Value) -> Result<Document, ClientError> {
        let payload: DocumentPayload = serde_json::from_value(v).expect("payload");
        Document::try_from(payload)
    }

    #[test]
    fn full_document_normalizes() {
        let doc = decode(json!({
            "id": 5,
            "name": "lease.pdf",
            "uploaded_at": "2024-03-01T10:15:00.123456Z",
            "status": "processed",
            "score": 82,
            "summary": "Mostly fine",
            "risks": [
                { "title": "Penalty", "description": "Uncapped penalty clause" },
                { "risk": "Termination", "recommendation": "Add notice period" },
                "Jurisdiction is foreign"
            ],
            "recommendations": [
                { "title": "Cap liability", "description": "Limit to contract value", "clause_example": "Liability shall not exceed..." }
            ],
            "file": "/media/contracts/lease.pdf",
            "improved_file": null
        }))
        .unwrap();

        assert_eq!(doc.id, Some(5));
        assert_eq!(doc.status, DocumentStatus::Processed);
        assert_eq!(doc.score, Some(82));
        assert_eq!(doc.band(), Some(ScoreBand::Good));
        assert_eq!(doc.uploaded_at.unwrap().year(), 2024);
        assert_eq!(doc.risks.len(), 3);
        assert_eq!(doc.risks[1].title.as_deref(), Some("Termination"));
        assert_eq!(doc.risks[1].description, "Add notice period");
        assert_eq!(doc.risks[2].title, None);
        assert_eq!(
            doc.recommendations[0].clause_example.as_deref(),
            Some("Liability shall not exceed...")
        );
        assert_eq!(doc.improved_file, None);
    }

    #[test]
    fn encoded_risks_string_is_parsed() {
        let doc = decode(json!({
            "id": 1,
            "status": "processed",
            "risks": "[{\"title\":\"A\",\"description\":\"B\"}]"
        }))
        .unwrap();
        assert_eq!(
            doc.risks,
            vec![Risk {
                title: Some("A".into()),
                description: "B".into()
            }]
        );
    }

    #[test]
    fn unparseable_risks_string_is_rejected() {
        let err = decode(json!({ "id": 1, "risks": "some free text" })).unwrap_err();
        assert!(matches!(err, ClientError::InvalidPayload(ref m) if m.contains("risks")));
    }

    #[test]
    fn pending_document_without_findings() {
        let doc = decode(json!({ "id": 5, "status": "pending" })).unwrap();
        assert_eq!(doc.status, DocumentStatus::Pending);
        assert!(doc.risks.is_empty());
        assert_eq!(doc.score, None);
        assert_eq!(doc.band(), None);
        assert_eq!(doc.display_name(), "Untitled");
    }

    #[test]
    fn guest_analysis_defaults_to_processed() {
        let doc = decode(json!({ "score": 45, "summary": "Risky", "risks": [] })).unwrap();
        assert_eq!(doc.id, None);
        assert_eq!(doc.status, DocumentStatus::Processed);
        assert_eq!(doc.band(), Some(ScoreBand::Risky));
    }

    #[test]
    fn unknown_status_and_naive_timestamp_are_tolerated() {
        let doc = decode(json!({
            "id": 3,
            "status": "queued",
            "uploaded_at": "2024-03-01T10:15:00.5"
        }))
        .unwrap();
        assert_eq!(doc.status, DocumentStatus::Pending);
        assert_eq!(doc.status.label(), "Processing");
        let at = doc.uploaded_at.unwrap();
        assert_eq!((at.year(), at.hour(), at.offset().is_utc()), (2024, 10, true));
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        assert!(decode(json!({ "id": 1, "score": 140 })).is_err());
        assert!(decode(json!({ "id": 1, "uploaded_at": "yesterday" })).is_err());
    }

    #[test]
    fn score_bands() {
        assert_eq!(ScoreBand::for_score(100), ScoreBand::Good);
        assert_eq!(ScoreBand::for_score(80), ScoreBand::Good);
        assert_eq!(ScoreBand::for_score(79), ScoreBand::Caution);
        assert_eq!(ScoreBand::for_score(50), ScoreBand::Caution);
        assert_eq!(ScoreBand::for_score(49), ScoreBand::Risky);
        assert_eq!(ScoreBand::for_score(0), ScoreBand::Risky);
    }
}
