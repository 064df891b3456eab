use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

/// Read-only mapping of topic name to the verses filed under it.
///
/// Topics keep the order they had in the source document; the resolver relies
/// on that order to break ties.
#[derive(Debug, Clone, Default)]
pub struct TopicStore {
    topics: Vec<Topic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    name: String,
    verses: Vec<String>,
}

impl Topic {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Verse references or literal verse strings. Never empty.
    pub fn verses(&self) -> &[String] {
        &self.verses
    }
}

#[derive(Debug)]
pub enum TopicStoreError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    NotAnObject,
    InvalidEntry { topic: String },
    EmptyTopic { topic: String },
}

impl fmt::Display for TopicStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicStoreError::Io(err) => write!(f, "failed to read topic map: {err}"),
            TopicStoreError::Parse(err) => write!(f, "topic map is not valid JSON: {err}"),
            TopicStoreError::NotAnObject => {
                write!(f, "topic map must be a JSON object of topic -> verse list")
            }
            TopicStoreError::InvalidEntry { topic } => {
                write!(f, "topic {topic:?} must map to an array of strings")
            }
            TopicStoreError::EmptyTopic { topic } => {
                write!(f, "topic {topic:?} has no verses")
            }
        }
    }
}

impl std::error::Error for TopicStoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TopicStoreError::Io(err) => Some(err),
            TopicStoreError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TopicStoreError {
    fn from(value: std::io::Error) -> Self {
        TopicStoreError::Io(value)
    }
}

impl From<serde_json::Error> for TopicStoreError {
    fn from(value: serde_json::Error) -> Self {
        TopicStoreError::Parse(value)
    }
}

impl TopicStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TopicStoreError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let store = Self::from_json_str(&raw)?;
        info!(path = %path.display(), topics = store.len(), "Loaded topic map");
        Ok(store)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, TopicStoreError> {
        let value: Value = serde_json::from_str(raw)?;
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(TopicStoreError::NotAnObject),
        }
    }

    fn from_map(map: Map<String, Value>) -> Result<Self, TopicStoreError> {
        let mut topics = Vec::with_capacity(map.len());
        for (name, value) in map {
            let Value::Array(items) = value else {
                return Err(TopicStoreError::InvalidEntry { topic: name });
            };
            let mut verses = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(verse) if !verse.trim().is_empty() => {
                        verses.push(verse.trim().to_string())
                    }
                    Value::String(_) => {}
                    _ => return Err(TopicStoreError::InvalidEntry { topic: name }),
                }
            }
            if verses.is_empty() {
                return Err(TopicStoreError::EmptyTopic { topic: name });
            }
            topics.push(Topic { name, verses });
        }
        Ok(Self { topics })
    }

    /// Builds a store from in-memory pairs, skipping topics without verses.
    pub fn from_pairs<I, N, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let topics = pairs
            .into_iter()
            .map(|(name, verses)| Topic {
                name: name.into(),
                verses: verses.into_iter().map(Into::into).collect(),
            })
            .filter(|topic| !topic.verses.is_empty())
            .collect();
        Self { topics }
    }

    pub fn get(&self, name: &str) -> Option<&Topic> {
        self.topics.iter().find(|topic| topic.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.topics.iter()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_document_order() {
        let store = TopicStore::from_json_str(
            r#"{ "zeal": ["Romans 12:11"], "anxiety": ["Philippians 4:6"], "love": ["1 John 4:8"] }"#,
        )
        .unwrap();
        let names: Vec<_> = store.iter().map(Topic::name).collect();
        assert_eq!(names, ["zeal", "anxiety", "love"]);
        assert_eq!(store.get("love").unwrap().verses(), ["1 John 4:8"]);
    }

    #[test]
    fn rejects_empty_verse_list() {
        let err = TopicStore::from_json_str(r#"{ "hope": [] }"#).unwrap_err();
        assert!(matches!(err, TopicStoreError::EmptyTopic { ref topic } if topic == "hope"));
    }

    #[test]
    fn blank_entries_do_not_count_as_verses() {
        let err = TopicStore::from_json_str(r#"{ "hope": ["  "] }"#).unwrap_err();
        assert!(matches!(err, TopicStoreError::EmptyTopic { .. }));
    }

    #[test]
    fn rejects_non_string_entries() {
        let err = TopicStore::from_json_str(r#"{ "hope": ["Romans 15:13", 7] }"#).unwrap_err();
        assert!(matches!(err, TopicStoreError::InvalidEntry { .. }));
        let err = TopicStore::from_json_str(r#"{ "hope": "Romans 15:13" }"#).unwrap_err();
        assert!(matches!(err, TopicStoreError::InvalidEntry { .. }));
    }

    #[test]
    fn rejects_non_object_documents() {
        let err = TopicStore::from_json_str(r#"["love"]"#).unwrap_err();
        assert!(matches!(err, TopicStoreError::NotAnObject));
        let err = TopicStore::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, TopicStoreError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = TopicStore::load("/nonexistent/biblebot/topic_map.json").unwrap_err();
        assert!(matches!(err, TopicStoreError::Io(_)));
        assert!(err.to_string().contains("failed to read topic map"));
    }

    #[test]
    fn shipped_topic_map_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/topic_map.json");
        let store = TopicStore::load(path).unwrap();
        assert!(!store.is_empty());
        assert!(store.get("love").is_some());
    }
}
