use crate::objects::{write_name, Object};

/// PDF dictionary keeping keys in insertion order, so that written
/// dictionaries are byte-for-byte reproducible
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary {
    entries: Vec<(String, Object)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Insert or replace; a replaced key keeps its original place
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Object>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Object> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Object)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(Object::as_dict)
    }

    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Object::as_name)
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Object::as_integer)
    }

    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(Object::as_bytes)
    }

    /// Serialize as `<< /Key value ... >>`, one entry per line
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"<<");
        for (key, value) in &self.entries {
            out.push(b'\n');
            write_name(key, out);
            out.push(b' ');
            value.write_to(out);
        }
        out.extend_from_slice(b"\n>>");
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }
}

impl FromIterator<(String, Object)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (String, Object)>>(iter: T) -> Self {
        let mut dict = Dictionary::new();
        for (key, value) in iter {
            dict.set(key, value);
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dictionary() {
        let dict = Dictionary::new();
        assert!(dict.is_empty());
        assert_eq!(dict.len(), 0);
    }

    #[test]
    fn test_set_and_get() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name("Standard".into()));
        dict.set("R", 3);
        dict.set("EncryptMetadata", false);

        assert_eq!(dict.get_name("Filter"), Some("Standard"));
        assert_eq!(dict.get_integer("R"), Some(3));
        assert_eq!(dict.get("EncryptMetadata"), Some(&Object::Boolean(false)));
        assert_eq!(dict.get("Missing"), None);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut dict = Dictionary::new();
        dict.set("A", 1);
        dict.set("B", 2);
        dict.set("A", 3);

        let keys: Vec<_> = dict.keys().cloned().collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(dict.get_integer("A"), Some(3));
    }

    #[test]
    fn test_remove() {
        let mut dict = Dictionary::new();
        dict.set("Temp", 1);

        assert!(dict.contains_key("Temp"));
        assert_eq!(dict.remove("Temp"), Some(Object::Integer(1)));
        assert!(!dict.contains_key("Temp"));
        assert_eq!(dict.remove("Temp"), None);
    }

    #[test]
    fn test_nested_dictionaries() {
        let mut std_cf = Dictionary::new();
        std_cf.set("CFM", Object::Name("AESV2".into()));
        let mut cf = Dictionary::new();
        cf.set("StdCF", std_cf);
        let mut root = Dictionary::new();
        root.set("CF", cf);

        let cfm = root
            .get_dict("CF")
            .and_then(|cf| cf.get_dict("StdCF"))
            .and_then(|std_cf| std_cf.get_name("CFM"));
        assert_eq!(cfm, Some("AESV2"));
    }

    #[test]
    fn test_write_preserves_order() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name("Standard".into()));
        dict.set("V", 1);
        dict.set("O", Object::String(b"a)".to_vec()));

        assert_eq!(
            dict.to_bytes(),
            b"<<\n/Filter /Standard\n/V 1\n/O (a\\))\n>>".to_vec()
        );
    }

    #[test]
    fn test_from_iterator() {
        let dict: Dictionary = vec![
            ("Name".to_string(), Object::Name("Test".into())),
            ("Count".to_string(), Object::Integer(5)),
        ]
        .into_iter()
        .collect();

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get_integer("Count"), Some(5));
    }
}
