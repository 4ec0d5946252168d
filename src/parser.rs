//! Smart-create boundary: turning a free-text booking request into a
//! workflow.
//!
//! The parsing itself is an external concern; the engine only consumes
//! the [`ItineraryParser`] seam. [`DefaultTemplateParser`] is the
//! non-NL fallback: a fixed booking template with a title derived from
//! the request text.

use async_trait::async_trait;
use thiserror::Error;

use crate::workflow::{Step, Workflow};

/// A booking request that could not be turned into a workflow.
#[derive(Debug, Error)]
#[error("could not parse booking request: {0}")]
pub struct ParseError(pub String);

/// Converts a free-text booking request into a new workflow.
#[async_trait]
pub trait ItineraryParser: Send + Sync {
    async fn parse(&self, request_text: &str) -> Result<Workflow, ParseError>;
}

/// Fixed-template parser: every booking gets the default three steps.
///
/// The workflow title is the request text, truncated to keep listings
/// readable.
#[derive(Debug, Default)]
pub struct DefaultTemplateParser;

const TITLE_MAX: usize = 30;

impl DefaultTemplateParser {
    fn title_for(request_text: &str) -> String {
        let trimmed = request_text.trim();
        if trimmed.chars().count() > TITLE_MAX {
            let head: String = trimmed.chars().take(TITLE_MAX - 3).collect();
            format!("{head}...")
        } else {
            trimmed.to_string()
        }
    }
}

#[async_trait]
impl ItineraryParser for DefaultTemplateParser {
    async fn parse(&self, request_text: &str) -> Result<Workflow, ParseError> {
        if request_text.trim().is_empty() {
            return Err(ParseError("empty booking request".to_string()));
        }

        let steps = vec![
            Step::new("Flight Selection", "Select flight"),
            Step::new("Hotel Booking", "Select hotel"),
            Step::new("Payment", "Complete payment"),
        ];
        Ok(Workflow::new(Self::title_for(request_text), steps))
    }
}
