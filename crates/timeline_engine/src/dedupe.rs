use std::collections::HashSet;

use crate::types::Post;

/// Accumulates accepted posts in discovery order, rejecting empties, exact
/// duplicates, and anything past the `max_posts` bound.
pub struct PostCollector {
    max_posts: usize,
    seen: HashSet<String>,
    posts: Vec<Post>,
}

impl PostCollector {
    pub fn new(max_posts: usize) -> Self {
        Self {
            max_posts,
            seen: HashSet::new(),
            posts: Vec::new(),
        }
    }

    /// Returns true when the post was accepted. Text is compared after
    /// trimming; two posts with identical trimmed text are one post.
    pub fn accept(&mut self, post: Post) -> bool {
        if self.is_full() {
            return false;
        }
        let trimmed = post.text.trim();
        if trimmed.is_empty() {
            return false;
        }
        if !self.seen.insert(trimmed.to_string()) {
            return false;
        }
        self.posts.push(Post {
            text: trimmed.to_string(),
            timestamp: post.timestamp,
            platform: post.platform,
        });
        true
    }

    pub fn is_full(&self) -> bool {
        self.posts.len() >= self.max_posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn into_posts(self) -> Vec<Post> {
        self.posts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Platform;

    fn post(text: &str) -> Post {
        Post {
            text: text.to_string(),
            timestamp: "Unknown".to_string(),
            platform: Platform::Twitter,
        }
    }

    #[test]
    fn rejects_duplicates_after_trimming() {
        let mut collector = PostCollector::new(10);
        assert!(collector.accept(post("hello world")));
        assert!(!collector.accept(post("  hello world  ")));
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn rejects_empty_text() {
        let mut collector = PostCollector::new(10);
        assert!(!collector.accept(post("   ")));
        assert!(collector.is_empty());
    }

    #[test]
    fn stops_at_the_bound_and_keeps_order() {
        let mut collector = PostCollector::new(2);
        assert!(collector.accept(post("first")));
        assert!(collector.accept(post("second")));
        assert!(collector.is_full());
        assert!(!collector.accept(post("third")));
        let texts: Vec<String> = collector.into_posts().into_iter().map(|p| p.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
