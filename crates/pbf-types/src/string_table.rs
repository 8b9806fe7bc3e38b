use crate::proto;

/// Per-block string table.
///
/// Every key, value and role in a block is an index into this table.
/// Index 0 is conventionally the empty string: dense nodes use it as the
/// end-of-tags marker, so writers never place a real string there.
///
/// Entries are stored as `bytes` on the wire. Invalid UTF-8 is replaced
/// rather than rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    #[must_use]
    pub fn new(strings: Vec<String>) -> Self {
        Self { strings }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.strings
    }
}

impl From<proto::StringTable> for StringTable {
    fn from(msg: proto::StringTable) -> Self {
        let strings = msg
            .s
            .into_iter()
            .map(|bytes| match String::from_utf8(bytes) {
                Ok(s) => s,
                Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
            })
            .collect();
        Self { strings }
    }
}

impl From<&StringTable> for proto::StringTable {
    fn from(table: &StringTable) -> Self {
        Self {
            s: table.strings.iter().map(|s| s.as_bytes().to_vec()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_their_indices() {
        let table = StringTable::new(vec![String::new(), "highway".into(), "primary".into()]);
        let decoded = StringTable::from(proto::StringTable::from(&table));
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded.get(0), Some(""));
        assert_eq!(decoded.get(2), Some("primary"));
        assert_eq!(decoded.get(3), None);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let msg = proto::StringTable {
            s: vec![vec![b'a', 0xFF]],
        };
        assert_eq!(StringTable::from(msg).get(0), Some("a\u{FFFD}"));
    }
}
