use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

// Optional 1-3 book number, one-word book name, chapter:verse and an optional
// `-verse` range.
const REFERENCE_PATTERN: &str =
    r"(?i)\b(?:([1-3])\s*)?([a-z]+)\.?\s+(\d{1,3}):(\d{1,3})(?:\s*[-–]\s*(\d{1,3}))?\b";

static REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(REFERENCE_PATTERN).expect("valid reference pattern"));
static EXACT_REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\s*(?:{REFERENCE_PATTERN})\s*$")).expect("valid reference pattern")
});

/// A verse reference found inside free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceMatch {
    /// The matched substring, exactly as the user typed it.
    pub text: String,
    pub book: String,
    pub chapter: u16,
    pub verse: u16,
    pub end_verse: Option<u16>,
}

impl ReferenceMatch {
    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let whole = caps.get(0)?;
        let name = caps.get(2)?.as_str();
        let book = match caps.get(1) {
            Some(prefix) => format!("{} {name}", prefix.as_str()),
            None => name.to_string(),
        };
        let end_verse = match caps.get(5) {
            Some(end) => Some(end.as_str().parse().ok()?),
            None => None,
        };
        Some(Self {
            text: whole.as_str().trim().to_string(),
            book,
            chapter: caps.get(3)?.as_str().parse().ok()?,
            verse: caps.get(4)?.as_str().parse().ok()?,
            end_verse,
        })
    }
}

/// First reference-shaped substring in `text`.
pub fn find(text: &str) -> Option<ReferenceMatch> {
    REFERENCE_RE
        .captures(text)
        .and_then(|caps| ReferenceMatch::from_captures(&caps))
}

/// True when the whole of `text` is a single reference.
pub fn is_reference(text: &str) -> bool {
    EXACT_REFERENCE_RE.is_match(text)
}
