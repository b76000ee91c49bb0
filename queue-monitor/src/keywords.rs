/// The phrases that count as a queue pop, stored lowercase.
///
/// Matching is plain substring containment against text that has already
/// been lowercased, so "Solo Shuffle" on screen matches `solo shuffle`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keywords {
    keywords: Vec<String>,
}

impl Keywords {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// The first keyword (in list order) contained in `text`.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|keyword| text.contains(keyword.as_str()))
            .map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keywords
    }
}
