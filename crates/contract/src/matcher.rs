//! Paths and queries that may carry a Pact regex term.
//!
//! The mock service accepts either a bare string or a term of the form
//! `{"json_class": "Pact::Term", "data": {"generate": "/users/1", "matcher": {"json_class": "Regexp", "o": 0, "s": "^/users/\\d+$"}}}`.
//! Either way the proxy only cares about the example value, which is what a
//! consumer test actually sends.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const TERM_CLASS: &str = "Pact::Term";
const REGEXP_CLASS: &str = "Regexp";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PossiblyRegexedString {
    Plain(String),
    Regex {
        pattern: String,
        example: String,
        /// Ruby regexp option bits, kept so the term round-trips.
        options: i64,
    },
}

impl PossiblyRegexedString {
    /// The concrete string a request carries, whichever variant this is.
    pub fn example(&self) -> &str {
        match self {
            PossiblyRegexedString::Plain(value) => value,
            PossiblyRegexedString::Regex { example, .. } => example,
        }
    }
}

impl Default for PossiblyRegexedString {
    fn default() -> Self {
        PossiblyRegexedString::Plain(String::new())
    }
}

impl From<&str> for PossiblyRegexedString {
    fn from(value: &str) -> Self {
        PossiblyRegexedString::Plain(value.to_string())
    }
}

impl From<String> for PossiblyRegexedString {
    fn from(value: String) -> Self {
        PossiblyRegexedString::Plain(value)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawString {
    Plain(String),
    Term(Term),
}

#[derive(Serialize, Deserialize)]
struct Term {
    #[serde(default)]
    json_class: Option<String>,
    data: TermData,
}

#[derive(Serialize, Deserialize)]
struct TermData {
    generate: String,
    matcher: RegexpMatcher,
}

#[derive(Serialize, Deserialize)]
struct RegexpMatcher {
    #[serde(default)]
    json_class: Option<String>,
    #[serde(default)]
    o: i64,
    s: String,
}

impl<'de> Deserialize<'de> for PossiblyRegexedString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawString::deserialize(deserializer)? {
            RawString::Plain(value) => PossiblyRegexedString::Plain(value),
            RawString::Term(term) => PossiblyRegexedString::Regex {
                pattern: term.data.matcher.s,
                example: term.data.generate,
                options: term.data.matcher.o,
            },
        })
    }
}

impl Serialize for PossiblyRegexedString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PossiblyRegexedString::Plain(value) => serializer.serialize_str(value),
            PossiblyRegexedString::Regex {
                pattern,
                example,
                options,
            } => Term {
                json_class: Some(TERM_CLASS.to_string()),
                data: TermData {
                    generate: example.clone(),
                    matcher: RegexpMatcher {
                        json_class: Some(REGEXP_CLASS.to_string()),
                        o: *options,
                        s: pattern.clone(),
                    },
                },
            }
            .serialize(serializer),
        }
    }
}
