use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeHeader {
    pub name: String,
    pub value: String,
}

impl fmt::Display for MimeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] = [{}]", self.name, self.value)
    }
}

/// Ordered multimap of MIME headers.
///
/// Names compare case-insensitively and keep the spelling they were added
/// with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeHeaders {
    entries: Vec<MimeHeader>,
}

impl MimeHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every header called `name` with a single entry.
    ///
    /// The entry takes the position of the first existing match, or is
    /// appended when there is none.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter().position(|entry| same_name(&entry.name, &name)) {
            Some(first) => {
                self.entries[first].value = value;
                let mut index = 0;
                self.entries.retain(|entry| {
                    let keep = index <= first || !same_name(&entry.name, &name);
                    index += 1;
                    keep
                });
            }
            None => self.entries.push(MimeHeader { name, value }),
        }
    }

    /// Appends an entry, keeping existing ones with the same name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(MimeHeader {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|entry| !same_name(&entry.name, name));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// First value recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| same_name(&entry.name, name))
            .map(|entry| entry.value.as_str())
    }

    pub fn get_all<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.entries
            .iter()
            .filter(move |entry| same_name(&entry.name, name))
            .map(|entry| entry.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MimeHeader> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `[name] = [value]` per entry, newline separated.
    pub fn to_text(&self) -> String {
        self.entries
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for MimeHeaders {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = MimeHeaders::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}

fn same_name(left: &str, right: &str) -> bool {
    left.eq_ignore_ascii_case(right)
}
