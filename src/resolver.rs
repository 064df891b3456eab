//! Topic resolution: route a free-text question to the closest topic key.
//!
//! Both the query and every topic name are reduced to a set of lowercase word
//! tokens. A topic token counts as matched when some query token equals it or
//! one contains the other, and the score is
//! `matched / max(|query tokens|, |topic tokens|)`.

use crate::topics::{Topic, TopicStore};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Tokens shorter than this (in chars) are treated as noise.
pub const MIN_TOKEN_LEN: usize = 3;

/// Overlap ratio kept as an exact fraction.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Score {
    pub matched: usize,
    pub total: usize,
}

impl Score {
    pub const ZERO: Score = Score {
        matched: 0,
        total: 1,
    };

    pub fn is_zero(&self) -> bool {
        self.matched == 0
    }

    pub fn ratio(&self) -> f64 {
        self.matched as f64 / self.total as f64
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.matched * other.total).cmp(&(other.matched * self.total))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopicMatch<'a> {
    pub topic: &'a str,
    pub score: Score,
}

/// Lowercase alphanumeric runs of at least [`MIN_TOKEN_LEN`] chars, deduplicated
/// in order of first appearance.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut tokens: Vec<String> = Vec::new();
    for raw in text.split(|c: char| !c.is_alphanumeric()) {
        if raw.chars().count() < MIN_TOKEN_LEN {
            continue;
        }
        let token = raw.to_lowercase();
        if seen.insert(token.clone()) {
            tokens.push(token);
        }
    }
    tokens
}

fn tokens_overlap(a: &str, b: &str) -> bool {
    a == b || a.contains(b) || b.contains(a)
}

pub fn score_tokens(query: &[String], topic: &[String]) -> Score {
    if query.is_empty() || topic.is_empty() {
        return Score::ZERO;
    }
    let matched = topic
        .iter()
        .filter(|topic_token| query.iter().any(|q| tokens_overlap(q, topic_token)))
        .count();
    Score {
        matched,
        total: query.len().max(topic.len()),
    }
}

fn scored<'a>(query: &str, store: &'a TopicStore) -> impl Iterator<Item = TopicMatch<'a>> {
    let query_tokens = tokenize(query);
    store.iter().map(move |topic: &'a Topic| TopicMatch {
        topic: topic.name(),
        score: score_tokens(&query_tokens, &tokenize(topic.name())),
    })
}

/// Best topic for `query`, or `None` when no topic shares a token with it.
/// Equal scores keep the topic that comes first in the store.
pub fn resolve<'a>(query: &str, store: &'a TopicStore) -> Option<&'a str> {
    let mut best: Option<TopicMatch<'a>> = None;
    for candidate in scored(query, store) {
        if candidate.score.is_zero() {
            continue;
        }
        if best
            .as_ref()
            .is_none_or(|current| candidate.score > current.score)
        {
            best = Some(candidate);
        }
    }
    best.map(|m| m.topic)
}

/// Every topic with a non-zero score, best first. Ties keep store order.
pub fn rank<'a>(query: &str, store: &'a TopicStore) -> Vec<TopicMatch<'a>> {
    let mut matches: Vec<_> = scored(query, store)
        .filter(|m| !m.score.is_zero())
        .collect();
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches
}
