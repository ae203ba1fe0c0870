//! Ticket fields and their flattening into a single feature string

use serde::{Deserialize, Serialize};

/// Labels attached to a ticket.
///
/// Requests may carry either a list of label strings or a single scalar; the
/// scalar is kept as its already-stringified text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Labels {
    List(Vec<String>),
    Scalar(String),
}

impl Default for Labels {
    fn default() -> Self {
        Labels::List(Vec::new())
    }
}

impl Labels {
    /// Render the labels as the text that goes into the feature string.
    pub fn to_text(&self) -> String {
        match self {
            Labels::List(items) => items.join(" "),
            Labels::Scalar(text) => text.clone(),
        }
    }
}

impl From<Vec<String>> for Labels {
    fn from(items: Vec<String>) -> Self {
        Labels::List(items)
    }
}

impl From<&[&str]> for Labels {
    fn from(items: &[&str]) -> Self {
        Labels::List(items.iter().map(|s| s.to_string()).collect())
    }
}

/// A single issue-tracker ticket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub labels: Labels,
}

impl Ticket {
    pub fn new(title: impl Into<String>, description: impl Into<String>, labels: Labels) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            labels,
        }
    }

    /// Feature string for this ticket, see [`normalize`].
    pub fn feature_text(&self) -> String {
        normalize(&self.title, &self.description, &self.labels)
    }
}

/// Concatenate title, description and labels with single spaces.
///
/// The order is fixed and no trimming, case folding or tokenization happens
/// here, so training rows and serving requests produce identical strings.
pub fn normalize(title: &str, description: &str, labels: &Labels) -> String {
    format!("{} {} {}", title, description, labels.to_text())
}
