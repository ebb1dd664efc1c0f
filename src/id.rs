use std::fmt;

/// The canonical identifier of a metric: a name plus a sorted tag set.
///
/// The textual form is `name` when there are no tags, otherwise
/// `name|t1,t2,...` with tags sorted ascending, so identifiers are equal
/// under any permutation of the tag list. A name starting with `|` is
/// reserved: the registry strips the marker and skips prefix application at
/// flush time.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct MetricId(String);

impl MetricId {
    /// Builds the canonical identifier for `name` and `tags`.
    ///
    /// Tags are copied and sorted; the caller's slice is left untouched.
    pub fn new(name: &str, tags: &[&str]) -> MetricId {
        if tags.is_empty() {
            return MetricId(name.to_owned());
        }

        let mut sorted = tags.to_vec();
        sorted.sort_unstable();
        MetricId(format!("{}|{}", name, sorted.join(",")))
    }

    /// Splits the identifier back into its name and tags.
    pub fn split(&self) -> (&str, Vec<&str>) {
        match self.0.rfind('|') {
            Some(pos) if pos > 0 && pos + 1 < self.0.len() => {
                (&self.0[..pos], self.0[pos + 1..].split(',').collect())
            }
            _ => (self.0.as_str(), Vec::new()),
        }
    }

    /// The canonical textual form.
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}
