//! Document review workflow.
//!
//! Each of the four status fields on a [`Document`] advances through a small
//! set of legal transitions. Applying an [`Action`] checks the current state,
//! mutates the document and returns the [`Transition`] to record in the
//! workflow history.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::{
    ClassificationStatus, Document, DocumentStatus, NewWorkflowHistory, PolicyReviewStatus,
    RecommendationStatus,
};

/// Which status column a transition touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusType {
    DocumentStatus,
    ClassificationStatus,
    PolicyReviewStatus,
    RecommendationStatus,
}

impl StatusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentStatus => "document_status",
            Self::ClassificationStatus => "classification_status",
            Self::PolicyReviewStatus => "policy_review_status",
            Self::RecommendationStatus => "recommendation_status",
        }
    }
}

/// A workflow event.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Download,
    CompleteClassification { category: String, confidence: f64 },
    ApproveClassification,
    ChangeClassification { new_category: String },
    CompletePolicyReview { action: String, confidence: f64 },
    ApprovePolicy,
    ChangePolicy { new_action: String },
    CompleteRecommendation,
    ChangeRecommendation,
    ApproveRecommendation,
}

/// Loose parameters for building an [`Action`] from a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct ActionParams {
    pub category: Option<String>,
    pub confidence: Option<f64>,
    pub new_category: Option<String>,
    pub action: Option<String>,
    pub new_action: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TransitionError {
    #[error("cannot {action} when {status_type} is {current}")]
    Invalid {
        action: &'static str,
        status_type: &'static str,
        current: &'static str,
    },
    #[error("unknown workflow action: {0}")]
    UnknownAction(String),
    #[error("{action} requires `{param}`")]
    MissingParam {
        action: &'static str,
        param: &'static str,
    },
}

impl Action {
    pub const NAMES: &'static [&'static str] = &[
        "download",
        "complete_classification",
        "approve_classification",
        "change_classification",
        "complete_policy_review",
        "approve_policy",
        "change_policy",
        "complete_recommendation",
        "change_recommendation",
        "approve_recommendation",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::CompleteClassification { .. } => "complete_classification",
            Self::ApproveClassification => "approve_classification",
            Self::ChangeClassification { .. } => "change_classification",
            Self::CompletePolicyReview { .. } => "complete_policy_review",
            Self::ApprovePolicy => "approve_policy",
            Self::ChangePolicy { .. } => "change_policy",
            Self::CompleteRecommendation => "complete_recommendation",
            Self::ChangeRecommendation => "change_recommendation",
            Self::ApproveRecommendation => "approve_recommendation",
        }
    }

    /// Build an action from its name and request parameters.
    pub fn parse(name: &str, params: &ActionParams) -> Result<Self, TransitionError> {
        fn need<T: Clone>(
            value: &Option<T>,
            action: &'static str,
            param: &'static str,
        ) -> Result<T, TransitionError> {
            value
                .clone()
                .ok_or(TransitionError::MissingParam { action, param })
        }

        Ok(match name {
            "download" => Self::Download,
            "complete_classification" => Self::CompleteClassification {
                category: need(&params.category, "complete_classification", "category")?,
                confidence: need(&params.confidence, "complete_classification", "confidence")?,
            },
            "approve_classification" => Self::ApproveClassification,
            "change_classification" => Self::ChangeClassification {
                new_category: need(&params.new_category, "change_classification", "new_category")?,
            },
            "complete_policy_review" => Self::CompletePolicyReview {
                action: need(&params.action, "complete_policy_review", "action")?,
                confidence: need(&params.confidence, "complete_policy_review", "confidence")?,
            },
            "approve_policy" => Self::ApprovePolicy,
            "change_policy" => Self::ChangePolicy {
                new_action: need(&params.new_action, "change_policy", "new_action")?,
            },
            "complete_recommendation" => Self::CompleteRecommendation,
            "change_recommendation" => Self::ChangeRecommendation,
            "approve_recommendation" => Self::ApproveRecommendation,
            other => return Err(TransitionError::UnknownAction(other.to_string())),
        })
    }
}

/// The outcome of a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub status_type: StatusType,
    pub from_status: &'static str,
    pub to_status: &'static str,
    pub action_type: &'static str,
    pub metadata: serde_json::Value,
}

impl Transition {
    /// History row for this transition.
    pub fn into_history(
        self,
        document_id: i64,
        user_id: Option<i64>,
        notes: Option<String>,
    ) -> NewWorkflowHistory {
        NewWorkflowHistory {
            document_id,
            user_id,
            status_type: self.status_type.as_str().to_string(),
            from_status: self.from_status.to_string(),
            to_status: self.to_status.to_string(),
            action_type: self.action_type.to_string(),
            metadata: self.metadata,
            notes,
        }
    }
}

fn invalid(action: &Action, status_type: StatusType, current: &'static str) -> TransitionError {
    TransitionError::Invalid {
        action: action.name(),
        status_type: status_type.as_str(),
        current,
    }
}

/// Apply `action` to `document`.
///
/// On error the document is left untouched.
pub fn apply(document: &mut Document, action: &Action) -> Result<Transition, TransitionError> {
    let empty = || json!({});

    match action {
        Action::Download => {
            let from = document.document_status;
            if from != DocumentStatus::Discovered {
                return Err(invalid(action, StatusType::DocumentStatus, from.as_str()));
            }
            document.document_status = DocumentStatus::Downloaded;
            Ok(Transition {
                status_type: StatusType::DocumentStatus,
                from_status: from.as_str(),
                to_status: document.document_status.as_str(),
                action_type: action.name(),
                metadata: empty(),
            })
        }

        Action::CompleteClassification {
            category,
            confidence,
        } => {
            let from = document.classification_status;
            if from != ClassificationStatus::ClassificationPending {
                return Err(invalid(action, StatusType::ClassificationStatus, from.as_str()));
            }
            document.classification_status = ClassificationStatus::AutoClassified;
            document.recommended_category = Some(category.clone());
            document.category_confidence = Some(*confidence);
            Ok(Transition {
                status_type: StatusType::ClassificationStatus,
                from_status: from.as_str(),
                to_status: document.classification_status.as_str(),
                action_type: action.name(),
                metadata: json!({ "category": category, "confidence": confidence }),
            })
        }

        Action::ApproveClassification => {
            let from = document.classification_status;
            if from != ClassificationStatus::AutoClassified {
                return Err(invalid(action, StatusType::ClassificationStatus, from.as_str()));
            }
            document.classification_status = ClassificationStatus::Classified;
            document.approved_category = document.recommended_category.clone();
            Ok(Transition {
                status_type: StatusType::ClassificationStatus,
                from_status: from.as_str(),
                to_status: document.classification_status.as_str(),
                action_type: action.name(),
                metadata: empty(),
            })
        }

        Action::ChangeClassification { new_category } => {
            let from = document.classification_status;
            if from != ClassificationStatus::AutoClassified {
                return Err(invalid(action, StatusType::ClassificationStatus, from.as_str()));
            }
            document.classification_status = ClassificationStatus::Reclassified;
            document.changed_category = Some(new_category.clone());
            Ok(Transition {
                status_type: StatusType::ClassificationStatus,
                from_status: from.as_str(),
                to_status: document.classification_status.as_str(),
                action_type: action.name(),
                metadata: json!({ "new_category": new_category }),
            })
        }

        Action::CompletePolicyReview {
            action: accessibility_action,
            confidence,
        } => {
            let from = document.policy_review_status;
            if from != PolicyReviewStatus::PolicyPending {
                return Err(invalid(action, StatusType::PolicyReviewStatus, from.as_str()));
            }
            document.policy_review_status = PolicyReviewStatus::AutoReviewed;
            document.recommended_accessibility_action = Some(accessibility_action.clone());
            document.accessibility_confidence = Some(*confidence);
            Ok(Transition {
                status_type: StatusType::PolicyReviewStatus,
                from_status: from.as_str(),
                to_status: document.policy_review_status.as_str(),
                action_type: action.name(),
                metadata: json!({ "action": accessibility_action, "confidence": confidence }),
            })
        }

        Action::ApprovePolicy => {
            let from = document.policy_review_status;
            if from != PolicyReviewStatus::AutoReviewed {
                return Err(invalid(action, StatusType::PolicyReviewStatus, from.as_str()));
            }
            document.policy_review_status = PolicyReviewStatus::Reviewed;
            document.approved_accessibility_action =
                document.recommended_accessibility_action.clone();
            Ok(Transition {
                status_type: StatusType::PolicyReviewStatus,
                from_status: from.as_str(),
                to_status: document.policy_review_status.as_str(),
                action_type: action.name(),
                metadata: empty(),
            })
        }

        Action::ChangePolicy { new_action } => {
            let from = document.policy_review_status;
            if from != PolicyReviewStatus::AutoReviewed {
                return Err(invalid(action, StatusType::PolicyReviewStatus, from.as_str()));
            }
            document.policy_review_status = PolicyReviewStatus::Rereviewed;
            document.changed_accessibility_action = Some(new_action.clone());
            Ok(Transition {
                status_type: StatusType::PolicyReviewStatus,
                from_status: from.as_str(),
                to_status: document.policy_review_status.as_str(),
                action_type: action.name(),
                metadata: json!({ "new_action": new_action }),
            })
        }

        Action::CompleteRecommendation => {
            recommendation_step(
                document,
                action,
                &[RecommendationStatus::RecommendationPending],
                RecommendationStatus::AutoRecommendation,
            )
        }

        Action::ChangeRecommendation => recommendation_step(
            document,
            action,
            &[RecommendationStatus::AutoRecommendation],
            RecommendationStatus::RecommendationAdjusted,
        ),

        Action::ApproveRecommendation => recommendation_step(
            document,
            action,
            &[
                RecommendationStatus::AutoRecommendation,
                RecommendationStatus::RecommendationAdjusted,
            ],
            RecommendationStatus::Recommended,
        ),
    }
}

fn recommendation_step(
    document: &mut Document,
    action: &Action,
    allowed_from: &[RecommendationStatus],
    to: RecommendationStatus,
) -> Result<Transition, TransitionError> {
    let from = document.recommendation_status;
    if !allowed_from.contains(&from) {
        return Err(invalid(action, StatusType::RecommendationStatus, from.as_str()));
    }
    document.recommendation_status = to;
    Ok(Transition {
        status_type: StatusType::RecommendationStatus,
        from_status: from.as_str(),
        to_status: to.as_str(),
        action_type: action.name(),
        metadata: json!({}),
    })
}
