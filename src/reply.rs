use crate::verse::VerseText;
use serde::Serialize;

pub const INTROS: &[&str] = &[
    "It sounds like you're asking about",
    "Here is a passage on",
    "Scripture has a lot to say about",
    "Let's look at what the Bible says about",
];

pub const CLOSINGS: &[&str] = &[
    "May this encourage you today.",
    "I hope this speaks to you.",
    "Feel free to ask about another topic.",
    "Take a moment to reflect on it.",
];

pub const FALLBACK: &str =
    "I'm not sure which Bible topic that relates to. Could you rephrase it?";

pub const APOLOGY: &str = "Sorry, I couldn't load the text of that passage right now.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyKind {
    Topic { topic: String, reference: String },
    Verse { reference: String },
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    #[serde(flatten)]
    pub kind: ReplyKind,
    pub text: String,
    /// Set when a verse lookup failed and the text carries an apology instead.
    pub degraded: bool,
}

impl Reply {
    pub fn fallback() -> Self {
        Self {
            kind: ReplyKind::Fallback,
            text: FALLBACK.to_string(),
            degraded: false,
        }
    }
}

/// What ends up under the book emoji in a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Passage {
    Fetched(VerseText),
    /// A reference or verse string shown without a lookup.
    Plain(String),
    Unavailable(String),
}

impl Passage {
    fn is_unavailable(&self) -> bool {
        matches!(self, Passage::Unavailable(_))
    }

    fn render(&self, closing: &str) -> String {
        match self {
            Passage::Fetched(verse) => {
                let heading = match &verse.translation {
                    Some(translation) => format!("{} ({translation})", verse.reference),
                    None => verse.reference.clone(),
                };
                format!("📖 {heading}\n\n{}\n\n{closing}", verse.text)
            }
            Passage::Plain(text) => format!("📖 {text}\n\n{closing}"),
            Passage::Unavailable(reference) => format!("📖 {reference}\n\n{APOLOGY}"),
        }
    }
}

pub fn topic_reply(
    topic: &str,
    reference: &str,
    passage: Passage,
    intro: &str,
    closing: &str,
) -> Reply {
    Reply {
        kind: ReplyKind::Topic {
            topic: topic.to_string(),
            reference: reference.to_string(),
        },
        text: format!("{intro} **{topic}**.\n\n{}", passage.render(closing)),
        degraded: passage.is_unavailable(),
    }
}

pub fn verse_reply(reference: &str, passage: Passage, closing: &str) -> Reply {
    Reply {
        kind: ReplyKind::Verse {
            reference: reference.to_string(),
        },
        text: passage.render(closing),
        degraded: passage.is_unavailable(),
    }
}
