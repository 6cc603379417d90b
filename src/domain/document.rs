//! Assembled reading material: a titled document made of chapters.

use serde::{Deserialize, Serialize};

/// A titled span of transcript text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub text: String,
}

impl Chapter {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// A document ready for export.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub title: String,
    pub author: Option<String>,
    pub summary: Option<String>,
    pub chapters: Vec<Chapter>,
}

impl Document {
    pub fn new(title: impl Into<String>, chapters: Vec<Chapter>) -> Self {
        Self {
            title: title.into(),
            author: None,
            summary: None,
            chapters,
        }
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary;
        self
    }
}
