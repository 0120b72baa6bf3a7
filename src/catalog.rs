use crate::object::ClassId;
use std::collections::BTreeMap;

pub const UNKNOWN_CLASS_NAME: &str = "unknown";

/// Class id to class name, rebuilt from scratch on every snapshot.
#[derive(Debug, Default)]
pub struct ClassCatalog {
    names: BTreeMap<ClassId, String>,
}

/// `Ljava/lang/String;` -> `java.lang.String`. Anything else (primitive and
/// array descriptors, already dotted names) passes through unchanged.
pub fn jni_to_dotted(raw: &str) -> String {
    match raw
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
    {
        Some(inner) => inner.replace('/', "."),
        None => raw.to_string(),
    }
}

impl ClassCatalog {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn reload<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (ClassId, S)>,
        S: AsRef<str>,
    {
        self.names.clear();
        for (class_id, raw) in entries {
            self.names.insert(class_id, jni_to_dotted(raw.as_ref()));
        }
    }

    pub fn lookup(&self, class_id: ClassId) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }

    pub fn name_or_unknown(&self, class_id: ClassId) -> &str {
        self.lookup(class_id).unwrap_or(UNKNOWN_CLASS_NAME)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Classes in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }
}
