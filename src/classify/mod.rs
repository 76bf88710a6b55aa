//! Keyword-based classification of window titles into activity categories.
//! [Classifier] is pure and stateless; keyword lists are configuration data.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Activity category assigned to a focused window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Learning,
    Productive,
    Distraction,
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Learning => write!(f, "learning"),
            Category::Productive => write!(f, "productive"),
            Category::Distraction => write!(f, "distraction"),
        }
    }
}

const LEARNING_KEYWORDS: &[&str] = &[
    "code",
    "vscode",
    "python",
    "tutorial",
    "docs",
    "stackoverflow",
    "github",
    "udemy",
    "coursera",
    "documentation",
    "java",
    "javascript",
    "html",
    "css",
    "react",
    "node",
    "programming",
    "leetcode",
    "hackerrank",
];

const DISTRACTION_KEYWORDS: &[&str] = &[
    "netflix",
    "youtube",
    "facebook",
    "instagram",
    "reddit",
    "tiktok",
    "gaming",
    "twitch",
    "spotify",
    "twitter",
    "reels",
    "comedy",
    "trailer",
    "movie",
    "series",
    "meme",
    "snapchat",
];

/// Maps window titles to a [Category] through case-insensitive substring
/// matching. Learning keywords are checked before distraction keywords, so a
/// title matching both lists counts as learning.
#[derive(Debug, Clone)]
pub struct Classifier {
    learning: Vec<String>,
    distraction: Vec<String>,
}

impl Classifier {
    /// Builds a classifier with custom keyword lists. Keywords are matched
    /// lowercased.
    pub fn new(
        learning: impl IntoIterator<Item = String>,
        distraction: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            learning: learning.into_iter().map(|k| k.to_lowercase()).collect(),
            distraction: distraction.into_iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn categorize(&self, title: &str) -> Category {
        let title = title.to_lowercase();
        if self.learning.iter().any(|k| title.contains(k.as_str())) {
            return Category::Learning;
        }
        if self.distraction.iter().any(|k| title.contains(k.as_str())) {
            return Category::Distraction;
        }
        Category::Productive
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(
            LEARNING_KEYWORDS.iter().map(|k| k.to_string()),
            DISTRACTION_KEYWORDS.iter().map(|k| k.to_string()),
        )
    }
}
