//! Feeds scope in-app delivery to named channels.
//!
//! The catalog is the editor's local view of the feed collaborator's list.
//! Feeds are addressed either by id or by their 1-based position, which is
//! how the editor numbers its feed buttons.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedId(pub String);

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub id: FeedId,
    pub name: String,
}

/// Ordered list of known feeds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedCatalog {
    feeds: Vec<Feed>,
}

impl FeedCatalog {
    pub fn new(feeds: Vec<Feed>) -> Self {
        Self { feeds }
    }

    pub fn contains(&self, id: &FeedId) -> bool {
        self.feeds.iter().any(|f| &f.id == id)
    }

    pub fn get(&self, id: &FeedId) -> Option<&Feed> {
        self.feeds.iter().find(|f| &f.id == id)
    }

    /// Feed at a 1-based position
    pub fn by_index(&self, index: usize) -> Option<&Feed> {
        index.checked_sub(1).and_then(|i| self.feeds.get(i))
    }

    /// 1-based position of a feed
    pub fn index_of(&self, id: &FeedId) -> Option<usize> {
        self.feeds.iter().position(|f| &f.id == id).map(|i| i + 1)
    }

    /// Add a feed, replacing any entry with the same id
    pub fn push(&mut self, feed: Feed) {
        if let Some(existing) = self.feeds.iter_mut().find(|f| f.id == feed.id) {
            *existing = feed;
        } else {
            self.feeds.push(feed);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feed> {
        self.feeds.iter()
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }
}
