//! Classification outcomes and failure diagnostics.
//!
//! The service explains failures in free text only. [`reason_for`] is the one
//! place that maps that text onto a [`ReasonCode`]; the codes feed log
//! messages and never change how the resolver behaves.

use serde::{Deserialize, Serialize};

use crate::client::ServiceReply;
use crate::geometry::Rect;

/// Diagnostic used when nothing more specific is known
pub const GENERIC_FAILURE: &str = "smart-driver classification failed";

const CLASSIFICATION_FAILED: &str = "Classification failed for element_name: ";

/// Why a classification did not produce an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReasonCode {
    /// The label has no training data yet; a human must label it
    NeedsLabeling,
    /// The label is frozen; the screenshot was not kept for training
    Frozen,
    /// The service failed for a reason we do not recognize
    UnknownServiceError,
    /// The service could not be reached or answered garbage
    Unavailable,
}

/// Map a service failure message onto a reason code.
///
/// First match wins: labeling hints, then frozen labels, then unknown.
#[must_use]
pub fn reason_for(message: &str) -> ReasonCode {
    if message.contains("Please label") || message.contains("Did not find") {
        ReasonCode::NeedsLabeling
    } else if message.contains("frozen label") {
        ReasonCode::Frozen
    } else {
        ReasonCode::UnknownServiceError
    }
}

/// Human readable explanation for a failed classification
#[must_use]
pub fn diagnostic(
    reason: ReasonCode,
    label: &str,
    server_url: &str,
    raw: &serde_json::Value,
) -> String {
    match reason {
        ReasonCode::NeedsLabeling => format!(
            "{CLASSIFICATION_FAILED}{label} - Please visit {server_url}/label/{label} to classify"
        ),
        ReasonCode::Frozen => format!(
            "{CLASSIFICATION_FAILED}{label} - However this element is frozen, so no new \
             screenshot was uploaded. Please unfreeze the element if you want to add this \
             screenshot to training"
        ),
        ReasonCode::UnknownServiceError => {
            format!("{GENERIC_FAILURE}: Unknown error, here was the API response: {raw}")
        }
        ReasonCode::Unavailable => GENERIC_FAILURE.to_string(),
    }
}

/// Element identified by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Raw pixel rectangle
    pub rect: Rect,
    /// Element class / tag
    pub tag_name: String,
    /// Element text
    pub text: String,
    /// Training key
    pub training_key: Option<String>,
}

/// Result of one classification call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassificationOutcome {
    /// The service identified the element
    Found(Classification),
    /// The service could not identify the element
    NotFound {
        /// Training key, if the service assigned one anyway
        training_key: Option<String>,
        /// Derived failure category
        reason: ReasonCode,
        /// Diagnostic message for logs and errors
        message: String,
    },
}

impl ClassificationOutcome {
    /// Interpret a `/classify` reply for `label`.
    #[must_use]
    pub fn from_reply(reply: ServiceReply, label: &str, server_url: &str) -> Self {
        let ServiceReply {
            success,
            key,
            elem,
            message,
            raw,
        } = reply;

        match (success, elem) {
            (true, Some(elem)) => Self::Found(Classification {
                rect: elem.rect(),
                tag_name: elem.class_name,
                text: elem.text,
                training_key: key,
            }),
            (true, None) => Self::NotFound {
                training_key: key,
                reason: ReasonCode::UnknownServiceError,
                message: diagnostic(ReasonCode::UnknownServiceError, label, server_url, &raw),
            },
            (false, _) => match message {
                Some(text) => {
                    let reason = reason_for(&text);
                    Self::NotFound {
                        training_key: key,
                        reason,
                        message: diagnostic(reason, label, server_url, &raw),
                    }
                }
                None => Self::NotFound {
                    training_key: key,
                    reason: ReasonCode::UnknownServiceError,
                    message: GENERIC_FAILURE.to_string(),
                },
            },
        }
    }

    /// The service could not be used at all
    #[must_use]
    pub fn unavailable() -> Self {
        Self::NotFound {
            training_key: None,
            reason: ReasonCode::Unavailable,
            message: GENERIC_FAILURE.to_string(),
        }
    }

    /// Training key, on either branch
    #[must_use]
    pub fn training_key(&self) -> Option<&str> {
        match self {
            Self::Found(found) => found.training_key.as_deref(),
            Self::NotFound { training_key, .. } => training_key.as_deref(),
        }
    }

    /// Check if an element was identified
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Failure reason, `None` when found
    #[must_use]
    pub const fn reason(&self) -> Option<ReasonCode> {
        match self {
            Self::Found(_) => None,
            Self::NotFound { reason, .. } => Some(*reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ServiceElement;

    fn failure(message: Option<&str>, key: Option<&str>) -> ServiceReply {
        let mut raw = serde_json::json!({"success": false});
        if let Some(m) = message {
            raw["message"] = serde_json::Value::from(m);
        }
        ServiceReply {
            success: false,
            key: key.map(str::to_string),
            elem: None,
            message: message.map(str::to_string),
            raw,
        }
    }

    mod reason_tests {
        use super::*;

        #[test]
        fn test_please_label() {
            assert_eq!(
                reason_for("Please label this element"),
                ReasonCode::NeedsLabeling
            );
        }

        #[test]
        fn test_did_not_find() {
            assert_eq!(
                reason_for("Did not find element in screenshot"),
                ReasonCode::NeedsLabeling
            );
        }

        #[test]
        fn test_frozen() {
            assert_eq!(
                reason_for("cannot update a frozen label here"),
                ReasonCode::Frozen
            );
        }

        #[test]
        fn test_labeling_wins_over_frozen() {
            assert_eq!(
                reason_for("Please label - frozen label"),
                ReasonCode::NeedsLabeling
            );
        }

        #[test]
        fn test_unknown() {
            assert_eq!(reason_for("quota exceeded"), ReasonCode::UnknownServiceError);
            assert_eq!(reason_for(""), ReasonCode::UnknownServiceError);
        }
    }

    mod diagnostic_tests {
        use super::*;

        #[test]
        fn test_needs_labeling_points_at_label_page() {
            let msg = diagnostic(
                ReasonCode::NeedsLabeling,
                "login_button",
                "https://sdk.test.ai",
                &serde_json::Value::Null,
            );
            assert_eq!(
                msg,
                "Classification failed for element_name: login_button - Please visit \
                 https://sdk.test.ai/label/login_button to classify"
            );
        }

        #[test]
        fn test_frozen_mentions_unfreeze() {
            let msg = diagnostic(ReasonCode::Frozen, "x", "u", &serde_json::Value::Null);
            assert!(msg.starts_with("Classification failed for element_name: x - However"));
            assert!(msg.contains("unfreeze"));
        }

        #[test]
        fn test_unknown_embeds_response() {
            let raw = serde_json::json!({"success": false, "message": "boom"});
            let msg = diagnostic(ReasonCode::UnknownServiceError, "x", "u", &raw);
            assert!(msg.starts_with(GENERIC_FAILURE));
            assert!(msg.contains("\"message\":\"boom\""));
        }
    }

    mod outcome_tests {
        use super::*;

        #[test]
        fn test_found() {
            let reply = ServiceReply {
                success: true,
                key: Some("k".to_string()),
                elem: Some(ServiceElement {
                    x: 1,
                    y: 2,
                    width: 3,
                    height: 4,
                    text: "Go".to_string(),
                    class_name: "button".to_string(),
                }),
                message: None,
                raw: serde_json::Value::Null,
            };
            let outcome = ClassificationOutcome::from_reply(reply, "go", "u");
            assert!(outcome.is_found());
            assert_eq!(outcome.training_key(), Some("k"));
            assert_eq!(outcome.reason(), None);
            let ClassificationOutcome::Found(found) = outcome else {
                panic!("expected found");
            };
            assert_eq!(found.rect, Rect::new(1, 2, 3, 4));
            assert_eq!(found.tag_name, "button");
            assert_eq!(found.text, "Go");
        }

        #[test]
        fn test_success_without_element_is_not_found() {
            let reply = ServiceReply {
                success: true,
                ..ServiceReply::default()
            };
            let outcome = ClassificationOutcome::from_reply(reply, "l", "u");
            assert_eq!(outcome.reason(), Some(ReasonCode::UnknownServiceError));
        }

        #[test]
        fn test_failure_keeps_key() {
            let outcome = ClassificationOutcome::from_reply(
                failure(Some("Please label it"), Some("k-2")),
                "l",
                "u",
            );
            assert_eq!(outcome.training_key(), Some("k-2"));
            assert_eq!(outcome.reason(), Some(ReasonCode::NeedsLabeling));
        }

        #[test]
        fn test_failure_without_message_is_generic() {
            let outcome = ClassificationOutcome::from_reply(failure(None, None), "l", "u");
            let ClassificationOutcome::NotFound { message, reason, .. } = outcome else {
                panic!("expected not found");
            };
            assert_eq!(message, GENERIC_FAILURE);
            assert_eq!(reason, ReasonCode::UnknownServiceError);
        }

        #[test]
        fn test_unavailable() {
            let outcome = ClassificationOutcome::unavailable();
            assert_eq!(outcome.reason(), Some(ReasonCode::Unavailable));
            assert!(outcome.training_key().is_none());
        }
    }
}
