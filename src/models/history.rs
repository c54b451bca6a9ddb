//! Audit trail of workflow status changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::ValidationErrors;

/// One recorded status transition on a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WorkflowHistory {
    pub id: i64,
    pub document_id: i64,
    pub user_id: Option<i64>,
    pub status_type: String,
    pub from_status: String,
    pub to_status: String,
    pub action_type: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// History row waiting to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkflowHistory {
    pub document_id: i64,
    pub user_id: Option<i64>,
    pub status_type: String,
    pub from_status: String,
    pub to_status: String,
    pub action_type: String,
    pub metadata: serde_json::Value,
    pub notes: Option<String>,
}

impl NewWorkflowHistory {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("from_status", Some(self.from_status.as_str()));
        errors.require("to_status", Some(self.to_status.as_str()));
        errors.require("action_type", Some(self.action_type.as_str()));
        errors.require("status_type", Some(self.status_type.as_str()));
        errors.into_result()
    }

    /// Metadata is always an object; anything else is stored as `{}`.
    pub fn metadata_json(&self) -> String {
        if self.metadata.is_object() {
            self.metadata.to_string()
        } else {
            "{}".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_fields() {
        let entry = NewWorkflowHistory {
            document_id: 1,
            user_id: None,
            status_type: "document_status".into(),
            from_status: String::new(),
            to_status: "downloaded".into(),
            action_type: "download".into(),
            metadata: serde_json::Value::Null,
            notes: None,
        };
        let errors = entry.validate().unwrap_err();
        assert!(errors.contains("from_status"));
        assert!(!errors.contains("to_status"));
        assert_eq!(entry.metadata_json(), "{}");
    }
}
