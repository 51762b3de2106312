use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::document::{Document, TemplateKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Draft,
    Completed,
    Review,
}

impl RecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Completed => "completed",
            RecordStatus::Review => "review",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(RecordStatus::Draft),
            "completed" => Ok(RecordStatus::Completed),
            "review" => Ok(RecordStatus::Review),
            other => Err(format!("unknown record status '{other}'")),
        }
    }
}

/// A stored resume as seen by the admin surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub full_name: String,
    pub email: String,
    pub template: TemplateKind,
    pub status: RecordStatus,
    pub data: Document,
}

impl ResumeRecord {
    /// Builds a fresh record with denormalized name/email columns taken from the document.
    pub fn new(document: Document, template: TemplateKind, status: RecordStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            full_name: display_name(&document),
            email: document.personal_info.email.clone(),
            template,
            status,
            data: document,
        }
    }
}

/// `first + " " + last`, the denormalized name column.
pub fn display_name(document: &Document) -> String {
    format!(
        "{} {}",
        document.personal_info.first_name, document.personal_info.last_name
    )
}

/// Raw `resumes` table row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub full_name: String,
    pub email: String,
    pub template: String,
    pub status: String,
    pub data: Value,
}

impl TryFrom<ResumeRow> for ResumeRecord {
    type Error = String;

    fn try_from(row: ResumeRow) -> Result<Self, Self::Error> {
        let data: Document = serde_json::from_value(row.data)
            .map_err(|e| format!("resume {} has an unreadable document: {e}", row.id))?;
        Ok(ResumeRecord {
            id: row.id,
            created_at: row.created_at,
            full_name: row.full_name,
            email: row.email,
            // Rows written by older editors may carry templates we no longer ship.
            template: row.template.parse().unwrap_or_default(),
            status: row.status.parse()?,
            data,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Admin list helpers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFilter {
    #[default]
    All,
    Completed,
    Draft,
    Review,
}

impl RecordFilter {
    pub fn matches(self, status: RecordStatus) -> bool {
        match self {
            RecordFilter::All => true,
            RecordFilter::Completed => status == RecordStatus::Completed,
            RecordFilter::Draft => status == RecordStatus::Draft,
            RecordFilter::Review => status == RecordStatus::Review,
        }
    }
}

/// Case-insensitive match on name or email, plain substring match on the id.
pub fn filter_records<'a>(
    records: &'a [ResumeRecord],
    query: &str,
    filter: RecordFilter,
) -> Vec<&'a ResumeRecord> {
    let needle = query.trim().to_lowercase();
    records
        .iter()
        .filter(|r| {
            needle.is_empty()
                || r.full_name.to_lowercase().contains(&needle)
                || r.email.to_lowercase().contains(&needle)
                || r.id.to_string().contains(query.trim())
        })
        .filter(|r| filter.matches(r.status))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordStats {
    pub total: usize,
    pub completed: usize,
    pub drafts: usize,
}

pub fn record_stats(records: &[ResumeRecord]) -> RecordStats {
    RecordStats {
        total: records.len(),
        completed: records
            .iter()
            .filter(|r| r.status == RecordStatus::Completed)
            .count(),
        drafts: records
            .iter()
            .filter(|r| r.status == RecordStatus::Draft)
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(first: &str, email: &str, status: RecordStatus) -> ResumeRecord {
        let mut doc = Document::default();
        doc.personal_info.first_name = first.to_string();
        doc.personal_info.last_name = "Smith".to_string();
        doc.personal_info.email = email.to_string();
        ResumeRecord::new(doc, TemplateKind::Classic, status)
    }

    #[test]
    fn test_new_record_denormalizes_name_and_email() {
        let r = record("Jane", "jane@x.io", RecordStatus::Draft);
        assert_eq!(r.full_name, "Jane Smith");
        assert_eq!(r.email, "jane@x.io");
    }

    #[test]
    fn test_filter_by_query_and_status() {
        let records = vec![
            record("Jane", "jane@x.io", RecordStatus::Completed),
            record("Bob", "bob@y.io", RecordStatus::Draft),
            record("Carol", "JANE.fan@z.io", RecordStatus::Review),
        ];

        let hits = filter_records(&records, "JANE", RecordFilter::All);
        assert_eq!(hits.len(), 2);

        let hits = filter_records(&records, "jane", RecordFilter::Review);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].full_name, "Carol Smith");

        let hits = filter_records(&records, "", RecordFilter::Draft);
        assert_eq!(hits.len(), 1);

        let id_prefix = records[1].id.to_string()[..8].to_string();
        let hits = filter_records(&records, &id_prefix, RecordFilter::All);
        assert_eq!(hits[0].id, records[1].id);
    }

    #[test]
    fn test_record_stats() {
        let records = vec![
            record("A", "", RecordStatus::Completed),
            record("B", "", RecordStatus::Completed),
            record("C", "", RecordStatus::Draft),
            record("D", "", RecordStatus::Review),
        ];
        assert_eq!(
            record_stats(&records),
            RecordStats {
                total: 4,
                completed: 2,
                drafts: 1
            }
        );
    }

    #[test]
    fn test_row_conversion_tolerates_unknown_template() {
        let row = ResumeRow {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            full_name: "A B".to_string(),
            email: String::new(),
            template: "retro".to_string(),
            status: "review".to_string(),
            data: serde_json::json!({ "summary": "hi" }),
        };
        let rec = ResumeRecord::try_from(row).unwrap();
        assert_eq!(rec.template, TemplateKind::Minimalist);
        assert_eq!(rec.status, RecordStatus::Review);
        assert_eq!(rec.data.summary, "hi");
    }

    #[test]
    fn test_row_conversion_rejects_unknown_status() {
        let row = ResumeRow {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            full_name: String::new(),
            email: String::new(),
            template: "tech".to_string(),
            status: "archived".to_string(),
            data: serde_json::json!({}),
        };
        assert!(ResumeRecord::try_from(row).is_err());
    }
}
