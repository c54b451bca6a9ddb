//! Documents discovered on a site and their triage state.
//!
//! A document moves through four independent status fields (see
//! [`crate::workflow`]) and carries the PDF metadata extracted for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::site::Site;
use super::validation::{ValidationErrors, BLANK, INVALID, NOT_INCLUDED};

/// Content categories a document can be filed under.
pub const CONTENT_TYPES: &[&str] = &[
    "Unknown",
    "Agreement",
    "Agenda",
    "Brochure",
    "Diagram",
    "Flyer",
    "Form",
    "Form Instruction",
    "Job Announcement",
    "Job Description",
    "Letter",
    "Map",
    "Memo",
    "Policy",
    "Slides",
    "Press",
    "Procurement",
    "Notice",
    "Report",
    "Spreadsheet",
];

/// Accessibility decisions a reviewer can record for a document.
pub const DECISION_TYPES: &[&str] = &["Unknown", "Leave", "Convert", "Remove", "Remediate"];

/// Whether the PDF has been fetched yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Discovered,
    Downloaded,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Downloaded => "downloaded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "discovered" => Some(Self::Discovered),
            "downloaded" => Some(Self::Downloaded),
            _ => None,
        }
    }
}

/// Progress of the content-category review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationStatus {
    #[default]
    ClassificationPending,
    AutoClassified,
    Classified,
    Reclassified,
}

impl ClassificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassificationPending => "classification_pending",
            Self::AutoClassified => "auto_classified",
            Self::Classified => "classified",
            Self::Reclassified => "reclassified",
        }
    }

    /// Accepts the legacy short spelling `pending`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "classification_pending" | "pending" => Some(Self::ClassificationPending),
            "auto_classified" => Some(Self::AutoClassified),
            "classified" => Some(Self::Classified),
            "reclassified" => Some(Self::Reclassified),
            _ => None,
        }
    }
}

/// Progress of the accessibility policy review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PolicyReviewStatus {
    #[default]
    PolicyPending,
    AutoReviewed,
    Reviewed,
    Rereviewed,
}

impl PolicyReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PolicyPending => "policy_pending",
            Self::AutoReviewed => "auto_reviewed",
            Self::Reviewed => "reviewed",
            Self::Rereviewed => "rereviewed",
        }
    }

    /// Accepts the legacy short spelling `pending`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "policy_pending" | "pending" => Some(Self::PolicyPending),
            "auto_reviewed" => Some(Self::AutoReviewed),
            "reviewed" => Some(Self::Reviewed),
            "rereviewed" => Some(Self::Rereviewed),
            _ => None,
        }
    }
}

/// Progress of the final remediation recommendation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    #[default]
    RecommendationPending,
    AutoRecommendation,
    RecommendationAdjusted,
    Recommended,
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecommendationPending => "recommendation_pending",
            Self::AutoRecommendation => "auto_recommendation",
            Self::RecommendationAdjusted => "recommendation_adjusted",
            Self::Recommended => "recommended",
        }
    }

    /// Accepts the legacy short spelling `pending`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "recommendation_pending" | "pending" => Some(Self::RecommendationPending),
            "auto_recommendation" => Some(Self::AutoRecommendation),
            "recommendation_adjusted" => Some(Self::RecommendationAdjusted),
            "recommended" => Some(Self::Recommended),
            _ => None,
        }
    }
}

/// Values of the free-form triage `status` column that the listing filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    InReview,
    Done,
}

impl TriageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InReview => "in_review",
            Self::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_review" => Some(Self::InReview),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// A PDF discovered at a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Document {
    pub id: i64,
    pub site_id: i64,
    pub file_name: String,
    pub url: String,
    pub file_size: Option<i64>,
    pub source: Option<String>,
    pub document_status: DocumentStatus,
    pub classification_status: ClassificationStatus,
    pub policy_review_status: PolicyReviewStatus,
    pub recommendation_status: RecommendationStatus,
    pub status: Option<String>,
    pub document_category: Option<String>,
    pub document_category_confidence: Option<f64>,
    pub accessibility_recommendation: Option<String>,
    pub accessibility_action: Option<String>,
    pub action_taken_on: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub modification_date: Option<DateTime<Utc>>,
    pub producer: Option<String>,
    pub pdf_version: Option<String>,
    pub number_of_pages: Option<i32>,
    pub last_modified: Option<DateTime<Utc>>,
    pub recommended_category: Option<String>,
    pub category_confidence: Option<f64>,
    pub approved_category: Option<String>,
    pub changed_category: Option<String>,
    pub recommended_accessibility_action: Option<String>,
    pub accessibility_confidence: Option<f64>,
    pub approved_accessibility_action: Option<String>,
    pub changed_accessibility_action: Option<String>,
    pub notes: Option<String>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// A freshly discovered document with every status at its default.
    pub fn new(site_id: i64, url: String, file_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            site_id,
            file_name,
            url,
            file_size: None,
            source: None,
            document_status: DocumentStatus::default(),
            classification_status: ClassificationStatus::default(),
            policy_review_status: PolicyReviewStatus::default(),
            recommendation_status: RecommendationStatus::default(),
            status: None,
            document_category: Some("Unknown".to_string()),
            document_category_confidence: None,
            accessibility_recommendation: Some("Unknown".to_string()),
            accessibility_action: None,
            action_taken_on: None,
            title: None,
            author: None,
            subject: None,
            keywords: None,
            creation_date: None,
            modification_date: None,
            producer: None,
            pdf_version: None,
            number_of_pages: None,
            last_modified: None,
            recommended_category: None,
            category_confidence: None,
            approved_category: None,
            changed_category: None,
            recommended_accessibility_action: None,
            accessibility_confidence: None,
            approved_accessibility_action: None,
            changed_accessibility_action: None,
            notes: None,
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the attribute-level rules that don't need the database.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("file_name", Some(self.file_name.as_str()));
        if errors.require("url", Some(self.url.as_str())) && url::Url::parse(self.url.trim()).is_err() {
            errors.add("url", INVALID);
        }
        if let Some(ref category) = self.document_category {
            if !CONTENT_TYPES.contains(&category.as_str()) {
                errors.add("document_category", NOT_INCLUDED);
            }
        }
        if let Some(ref decision) = self.accessibility_recommendation {
            if !DECISION_TYPES.contains(&decision.as_str()) {
                errors.add("accessibility_recommendation", NOT_INCLUDED);
            }
        }
        errors.into_result()
    }

    /// Object-store key of the current PDF binary.
    pub fn s3_path(&self, site: &Site) -> String {
        format!(
            "{}/{}/document.pdf",
            site.s3_endpoint_prefix().unwrap_or_default(),
            self.id
        )
    }
}

/// Derive a display filename from the last path segment of a URL.
pub fn file_name_from_url(raw: &str) -> String {
    let Ok(parsed) = url::Url::parse(raw.trim()) else {
        return raw.trim().to_string();
    };
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        });
    segment
        .or_else(|| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Attributes accepted when a document is created by hand.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DocumentInput {
    pub file_name: Option<String>,
    pub url: Option<String>,
    pub file_size: Option<i64>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub document_status: Option<String>,
    pub classification_status: Option<String>,
    pub policy_review_status: Option<String>,
    pub recommendation_status: Option<String>,
    pub document_category: Option<String>,
    pub document_category_confidence: Option<f64>,
    pub accessibility_recommendation: Option<String>,
    pub accessibility_action: Option<String>,
    pub action_taken_on: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
    pub modification_date: Option<DateTime<Utc>>,
    pub producer: Option<String>,
    pub pdf_version: Option<String>,
    pub number_of_pages: Option<i32>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Parse an optional status string, defaulting when absent.
fn parse_status<T: Default>(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&str>,
    parse: fn(&str) -> Option<T>,
) -> T {
    match value {
        None => T::default(),
        Some(v) if v.trim().is_empty() => {
            errors.add(field, BLANK);
            T::default()
        }
        Some(v) => parse(v).unwrap_or_else(|| {
            errors.add(field, NOT_INCLUDED);
            T::default()
        }),
    }
}

impl DocumentInput {
    /// Apply defaults and validate, producing an unsaved document for `site_id`.
    pub fn into_document(self, site_id: i64) -> Result<Document, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let document_status = parse_status(
            &mut errors,
            "document_status",
            self.document_status.as_deref(),
            DocumentStatus::from_str,
        );
        let classification_status = parse_status(
            &mut errors,
            "classification_status",
            self.classification_status.as_deref(),
            ClassificationStatus::from_str,
        );
        let policy_review_status = parse_status(
            &mut errors,
            "policy_review_status",
            self.policy_review_status.as_deref(),
            PolicyReviewStatus::from_str,
        );
        let recommendation_status = parse_status(
            &mut errors,
            "recommendation_status",
            self.recommendation_status.as_deref(),
            RecommendationStatus::from_str,
        );

        let url = self.url.unwrap_or_default();
        let file_name = self
            .file_name
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_default();

        let mut doc = Document::new(site_id, url, file_name);
        doc.file_size = self.file_size;
        doc.source = self.source;
        doc.status = self.status;
        doc.document_status = document_status;
        doc.classification_status = classification_status;
        doc.policy_review_status = policy_review_status;
        doc.recommendation_status = recommendation_status;
        if self.document_category.is_some() {
            doc.document_category = self.document_category;
        }
        doc.document_category_confidence = self.document_category_confidence;
        if self.accessibility_recommendation.is_some() {
            doc.accessibility_recommendation = self.accessibility_recommendation;
        }
        doc.accessibility_action = self.accessibility_action;
        doc.action_taken_on = self.action_taken_on;
        doc.title = self.title;
        doc.author = self.author;
        doc.subject = self.subject;
        doc.keywords = self.keywords;
        doc.creation_date = self.creation_date;
        doc.modification_date = self.modification_date;
        doc.producer = self.producer;
        doc.pdf_version = self.pdf_version;
        doc.number_of_pages = self.number_of_pages;
        doc.last_modified = self.last_modified;

        if let Err(more) = doc.validate() {
            errors.merge(more);
        }
        errors.into_result().map(|_| doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(url: &str) -> DocumentInput {
        DocumentInput {
            file_name: Some("budget.pdf".to_string()),
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_applied_before_validation() {
        let doc = input("https://example.gov/budget.pdf").into_document(1).unwrap();
        assert_eq!(doc.document_status, DocumentStatus::Discovered);
        assert_eq!(
            doc.classification_status,
            ClassificationStatus::ClassificationPending
        );
        assert_eq!(doc.policy_review_status, PolicyReviewStatus::PolicyPending);
        assert_eq!(
            doc.recommendation_status,
            RecommendationStatus::RecommendationPending
        );
        assert_eq!(doc.document_category.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_status_membership() {
        let mut bad = input("https://example.gov/a.pdf");
        bad.document_status = Some("invalid_status".to_string());
        bad.policy_review_status = Some("".to_string());
        let errors = bad.into_document(1).unwrap_err();
        assert_eq!(errors.get("document_status"), &[NOT_INCLUDED.to_string()]);
        assert_eq!(errors.get("policy_review_status"), &[BLANK.to_string()]);

        let mut legacy = input("https://example.gov/a.pdf");
        legacy.classification_status = Some("pending".to_string());
        assert!(legacy.into_document(1).is_ok());
    }

    #[test]
    fn test_required_fields_and_url_format() {
        let errors = DocumentInput::default().into_document(1).unwrap_err();
        assert!(errors.contains("file_name"));
        assert!(errors.contains("url"));

        let errors = input("not a url").into_document(1).unwrap_err();
        assert_eq!(errors.get("url"), &[INVALID.to_string()]);
    }

    #[test]
    fn test_category_and_recommendation_lists() {
        let mut doc = Document::new(1, "https://example.gov/a.pdf".into(), "a.pdf".into());
        doc.document_category = Some("Form Instruction".to_string());
        doc.accessibility_recommendation = None;
        assert!(doc.validate().is_ok());

        doc.document_category = Some("Permit".to_string());
        doc.accessibility_recommendation = Some("Shred".to_string());
        let errors = doc.validate().unwrap_err();
        assert!(errors.contains("document_category"));
        assert!(errors.contains("accessibility_recommendation"));
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://example.gov/files/Annual%20Report.pdf"),
            "Annual Report.pdf"
        );
        assert_eq!(file_name_from_url("https://example.gov/"), "example.gov");
    }

    #[test]
    fn test_s3_path_uses_site_prefix() {
        let site = Site::new(1, "City".into(), "Town, ST".into(), "https://www.city.org".into());
        let mut doc = Document::new(1, "https://www.city.org/a.pdf".into(), "a.pdf".into());
        doc.id = 42;
        assert_eq!(doc.s3_path(&site), "www-city-org/42/document.pdf");
    }
}
