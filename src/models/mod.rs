//! Data models for ASAP PDF.

mod document;
mod history;
mod site;
mod user;
mod validation;

pub use document::{
    file_name_from_url, ClassificationStatus, Document, DocumentInput, DocumentStatus,
    PolicyReviewStatus, RecommendationStatus, TriageStatus, CONTENT_TYPES, DECISION_TYPES,
};
pub use history::{NewWorkflowHistory, WorkflowHistory};
pub use site::{Site, SiteConflicts, SiteForm, S3_BUCKET};
pub use user::{Session, User};
pub use validation::{ValidationErrors, BLANK, INVALID, NOT_INCLUDED, TAKEN};
