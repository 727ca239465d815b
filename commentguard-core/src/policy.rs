use serde::{Deserialize, Deserializer};

/// Decides whether a comment must be hidden.
///
/// The orchestrator only talks to this trait, so a stricter matcher
/// (word boundaries, language-aware) can replace [`SubstringPolicy`].
pub trait PolicyEvaluator: Send + Sync {
    fn should_hide(&self, comment_text: Option<&str>) -> bool;
}

/// Lowercase terms whose presence in a comment triggers hiding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Denylist {
    terms: Vec<String>,
}

impl Denylist {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for term in terms {
            let term = term.as_ref().trim().to_lowercase();
            if !term.is_empty() && !normalized.contains(&term) {
                normalized.push(term);
            }
        }
        Self { terms: normalized }
    }

    /// Parses the comma separated form used by `OFFENSIVE_WORD`.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
}

impl<'de> Deserialize<'de> for Denylist {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<String>),
            Csv(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::List(terms) => Denylist::new(terms),
            Raw::Csv(raw) => Denylist::parse(&raw),
        })
    }
}

pub fn should_hide(comment_text: Option<&str>, denylist: &Denylist) -> bool {
    let text = match comment_text {
        Some(text) if !text.is_empty() => text.to_lowercase(),
        _ => return false,
    };

    // Plain substring search: "spam" also matches inside "spammer".
    denylist.terms.iter().any(|term| text.contains(term.as_str()))
}

/// Case-insensitive substring matching against a [`Denylist`].
#[derive(Debug, Clone)]
pub struct SubstringPolicy {
    denylist: Denylist,
}

impl SubstringPolicy {
    pub fn new(denylist: Denylist) -> Self {
        Self { denylist }
    }

    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }
}

impl PolicyEvaluator for SubstringPolicy {
    fn should_hide(&self, comment_text: Option<&str>) -> bool {
        should_hide(comment_text, &self.denylist)
    }
}
