use serde::Deserialize;

/// Document as the backend sends it, before normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentPayload {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    /// Kept as text; unknown values are mapped, not rejected.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub risks: Option<RawFindings>,
    #[serde(default)]
    pub recommendations: Option<RawFindings>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub improved_file: Option<String>,
}

/// Older rows store findings as a JSON-encoded string instead of an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawFindings {
    List(Vec<RawFinding>),
    Encoded(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawFinding {
    Text(String),
    Item(RawFindingItem),
}

/// Risks use `risk`/`recommendation` in some payloads and `title`/`description` in others.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFindingItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub clause_example: Option<String>,
}

