use serde::{Deserialize, Serialize};

/// Creator entry of a harvested record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitCreator {
    #[serde(rename = "creatorName")]
    pub creator_name: String,
}

/// Subject/keyword entry of a harvested record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitSubject {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_scheme: Option<String>,
    #[serde(default, rename = "schemaUri", skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,
    #[serde(default, rename = "valueUri", skip_serializing_if = "Option::is_none")]
    pub value_uri: Option<String>,
    #[serde(
        default,
        rename = "classificationCode",
        skip_serializing_if = "Option::is_none"
    )]
    pub classification_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitTitle {
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitDescription {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, rename = "descriptionType", skip_serializing_if = "Option::is_none")]
    pub description_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitDate {
    pub date: String,
    #[serde(rename = "dateType")]
    pub date_type: String,
}

/// Harvested metadata of a dataset (`_source` of a hit).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HitSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "_harvest_url", skip_serializing_if = "Option::is_none")]
    pub harvest_url: Option<String>,
    #[serde(default, rename = "_repo", skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default)]
    pub titles: Vec<HitTitle>,
    #[serde(default)]
    pub descriptions: Vec<HitDescription>,
    #[serde(default, rename = "publicationYear", skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<Vec<HitDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects: Option<Vec<HitSubject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creators: Option<Vec<HitCreator>>,
    #[serde(default, rename = "resourceType", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

/// One dataset hit returned by the search or rerank tool call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, rename = "_source")]
    pub source: HitSource,
    /// Index (OpenSearch) score.
    #[serde(default, rename = "_score")]
    pub index_score: f64,
    /// LLM rank score, present once the hit has been ranked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, rename = "fileExtensions", skip_serializing_if = "Option::is_none")]
    pub file_extensions: Option<Vec<String>>,
    #[serde(default, rename = "relevantTools", skip_serializing_if = "Option::is_none")]
    pub relevant_tools: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
}

impl DatasetHit {
    /// Flattened title if the backend provided one, else the first harvested title.
    pub fn display_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.source.titles.first().map(|t| t.title.as_str()))
    }

    /// LLM rank score when present, otherwise the index score.
    pub fn rank_score(&self) -> f64 {
        self.score.unwrap_or(self.index_score)
    }
}

/// Dataset hits plus the optional natural-language summary.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub hits: Vec<DatasetHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ResultSet {
    /// Parses the serialized `content` of a tool-call result event.
    pub fn from_content(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Serializes the result set into tool-call result `content`.
    pub fn to_content(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
