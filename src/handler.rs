use crate::reference;
use crate::reply::{self, CLOSINGS, INTROS, Passage, Reply};
use crate::resolver;
use crate::topics::TopicStore;
use crate::verse::VerseSource;
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyMessage,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyMessage => write!(f, "No message provided."),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Whether topic replies look up the passage text or just show the reference.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum VersePolicy {
    #[default]
    FetchText,
    ReferenceOnly,
}

/// Turns one chat message into one reply.
///
/// Tries, in order: a topic from the store, a verse reference typed by the
/// user, and finally the static fallback line.
pub struct Responder {
    store: Arc<TopicStore>,
    source: Arc<dyn VerseSource>,
    policy: VersePolicy,
    rng: Mutex<SmallRng>,
}

impl Responder {
    pub fn new(store: Arc<TopicStore>, source: Arc<dyn VerseSource>) -> Self {
        Self {
            store,
            source,
            policy: VersePolicy::default(),
            rng: Mutex::new(SmallRng::from_entropy()),
        }
    }

    pub fn with_policy(mut self, policy: VersePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(SmallRng::seed_from_u64(seed));
        self
    }

    pub fn store(&self) -> &TopicStore {
        &self.store
    }

    pub async fn handle(&self, message: &str) -> Result<Reply, ValidationError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }

        if let Some(topic) = resolver::resolve(message, &self.store) {
            debug!(topic, "Resolved message to topic");
            return Ok(self.topic_reply(topic).await);
        }

        if let Some(found) = reference::find(message) {
            debug!(reference = %found.text, "Message contains a verse reference");
            let closing = self.pick(CLOSINGS);
            let passage = self.lookup(&found.text).await;
            return Ok(reply::verse_reply(&found.text, passage, closing));
        }

        debug!("No topic or reference matched");
        Ok(Reply::fallback())
    }

    async fn topic_reply(&self, topic: &str) -> Reply {
        let (entry, intro, closing) = {
            let mut rng = self.rng.lock();
            let entry = self
                .store
                .get(topic)
                .and_then(|t| t.verses().choose(&mut *rng))
                .cloned()
                .unwrap_or_default();
            let intro = INTROS.choose(&mut *rng).copied().unwrap_or_default();
            let closing = CLOSINGS.choose(&mut *rng).copied().unwrap_or_default();
            (entry, intro, closing)
        };
        let passage = match self.policy {
            VersePolicy::FetchText if reference::is_reference(&entry) => {
                self.lookup(&entry).await
            }
            _ => Passage::Plain(entry.clone()),
        };
        reply::topic_reply(topic, &entry, passage, intro, closing)
    }

    async fn lookup(&self, reference: &str) -> Passage {
        match self.source.fetch(reference).await {
            Ok(verse) => Passage::Fetched(verse),
            Err(err) => {
                warn!(error = %err, reference, "Verse lookup failed");
                Passage::Unavailable(reference.to_string())
            }
        }
    }

    fn pick(&self, pool: &[&'static str]) -> &'static str {
        pool.choose(&mut *self.rng.lock())
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::{APOLOGY, FALLBACK, ReplyKind};
    use crate::verse::fixtures::{FailingSource, StaticSource};

    fn store() -> Arc<TopicStore> {
        Arc::new(TopicStore::from_pairs([
            ("love", vec!["1 John 4:8"]),
            ("faith", vec!["Hebrews 11:1"]),
        ]))
    }

    fn responder(source: Arc<dyn VerseSource>) -> Responder {
        Responder::new(store(), source).with_seed(7)
    }

    #[tokio::test]
    async fn empty_and_blank_messages_are_rejected() {
        let responder = responder(Arc::new(StaticSource::default()));
        assert_eq!(
            responder.handle("").await,
            Err(ValidationError::EmptyMessage)
        );
        assert_eq!(
            responder.handle("   ").await,
            Err(ValidationError::EmptyMessage)
        );
    }

    #[tokio::test]
    async fn topic_message_fetches_a_verse_from_the_topic() {
        let source = Arc::new(StaticSource::default());
        let responder = responder(source.clone());
        let reply = responder.handle("tell me about love").await.unwrap();
        assert_eq!(
            reply.kind,
            ReplyKind::Topic {
                topic: "love".to_string(),
                reference: "1 John 4:8".to_string(),
            }
        );
        assert!(reply.text.contains("**love**"));
        assert!(reply.text.contains("Text of 1 John 4:8."));
        assert!(!reply.degraded);
        assert_eq!(source.calls(), ["1 John 4:8"]);
    }

    #[tokio::test]
    async fn reference_message_without_topic_takes_the_verse_path() {
        let source = Arc::new(StaticSource::default());
        let responder = responder(source.clone());
        let reply = responder.handle("John 3:16").await.unwrap();
        assert_eq!(
            reply.kind,
            ReplyKind::Verse {
                reference: "John 3:16".to_string()
            }
        );
        assert!(reply.text.starts_with("📖 John 3:16 (King James Version)"));
        assert_eq!(source.calls(), ["John 3:16"]);
    }

    #[tokio::test]
    async fn unmatched_message_gets_the_fallback() {
        let source = Arc::new(StaticSource::default());
        let responder = responder(source.clone());
        let reply = responder.handle("xyz").await.unwrap();
        assert_eq!(reply.kind, ReplyKind::Fallback);
        assert_eq!(reply.text, FALLBACK);
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_lookup_apologises_without_leaking_the_error() {
        let responder = responder(Arc::new(FailingSource));
        let reply = responder.handle("what is John 3:16?").await.unwrap();
        assert!(reply.degraded);
        assert!(reply.text.contains(APOLOGY));
        assert!(reply.text.contains("John 3:16"));
        assert!(!reply.text.contains("connection refused"));
        assert!(!reply.text.contains("os error"));

        let reply = responder.handle("I want more faith").await.unwrap();
        assert!(reply.degraded);
        assert!(reply.text.contains("**faith**"));
        assert!(reply.text.contains(APOLOGY));
    }

    #[tokio::test]
    async fn same_seed_gives_same_reply() {
        let store = Arc::new(TopicStore::from_pairs([(
            "hope",
            vec!["Romans 15:13", "Jeremiah 29:11", "Psalm 42:11", "Isaiah 40:31"],
        )]));
        let source: Arc<dyn VerseSource> = Arc::new(StaticSource::default());
        let first = Responder::new(store.clone(), source.clone()).with_seed(42);
        let second = Responder::new(store, source).with_seed(42);
        for _ in 0..5 {
            assert_eq!(
                first.handle("I need hope").await,
                second.handle("I need hope").await
            );
        }
    }

    #[tokio::test]
    async fn selection_stays_within_the_topic_list() {
        let verses = ["Romans 15:13", "Jeremiah 29:11", "Psalm 42:11"];
        let store = Arc::new(TopicStore::from_pairs([("hope", verses.to_vec())]));
        let responder = Responder::new(store, Arc::new(StaticSource::default())).with_seed(3);
        for _ in 0..20 {
            let reply = responder.handle("hope").await.unwrap();
            let ReplyKind::Topic { reference, .. } = reply.kind else {
                panic!("expected a topic reply");
            };
            assert!(verses.contains(&reference.as_str()));
        }
    }

    #[tokio::test]
    async fn reference_only_policy_skips_the_lookup() {
        let source = Arc::new(StaticSource::default());
        let responder = responder(source.clone()).with_policy(VersePolicy::ReferenceOnly);
        let reply = responder.handle("love").await.unwrap();
        assert!(reply.text.contains("📖 1 John 4:8\n\n"));
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn literal_verse_strings_are_shown_as_is() {
        let store = Arc::new(TopicStore::from_pairs([(
            "comfort",
            vec!["The Lord is my shepherd; I shall not want."],
        )]));
        let source = Arc::new(StaticSource::default());
        let responder = Responder::new(store, source.clone()).with_seed(1);
        let reply = responder.handle("I need comfort").await.unwrap();
        assert!(reply.text.contains("The Lord is my shepherd; I shall not want."));
        assert!(source.calls().is_empty());
    }
}
