//! FITS header card parsing and the ordered keyword map of a unit.

use std::borrow::Cow;

use crate::block::CARD_SIZE;
use crate::error::{Error, Result};

/// Keyword terminating a header region. Never stored.
pub const END_KEYWORD: &str = "END";

/// Divider between the value and the comment of a card.
const COMMENT_DIVIDER: &str = "/ ";

// ── Types ──

/// The value half of a header card: the trimmed value text plus the comment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderValue {
    value: String,
    comment: String,
}

impl HeaderValue {
    pub fn new(value: impl Into<String>, comment: impl Into<String>) -> Self {
        HeaderValue {
            value: value.into(),
            comment: comment.into(),
        }
    }

    /// The raw value text, as written after the `=` separator and trimmed.
    /// String values keep their single quotes; see [`HeaderValue::as_str`].
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The comment text, empty when the card had none.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Concatenate `more` onto the value. The comment is kept.
    pub fn append(&mut self, more: &str) {
        self.value.push_str(more);
    }

    /// The value with FITS string quoting removed.
    ///
    /// `'IMAGE   '` becomes `IMAGE` and doubled quotes collapse to one.
    /// Unquoted values are returned unchanged.
    pub fn as_str(&self) -> Cow<'_, str> {
        let v = self.value.trim();
        match v
            .strip_prefix('\'')
            .and_then(|rest| rest.strip_suffix('\''))
        {
            Some(inner) if inner.contains("''") => Cow::Owned(inner.trim_end().replace("''", "'")),
            Some(inner) => Cow::Borrowed(inner.trim_end()),
            None => Cow::Borrowed(v),
        }
    }

    /// Parse the value as a decimal integer.
    pub fn as_integer(&self) -> Option<i64> {
        self.value.trim().parse().ok()
    }

    /// Parse the value as a FITS logical (`T` or `F`).
    pub fn as_logical(&self) -> Option<bool> {
        match self.value.trim() {
            "T" => Some(true),
            "F" => Some(false),
            _ => None,
        }
    }

    /// Render as `value / comment`.
    pub fn to_string_with_comment(&self) -> String {
        format!("{} / {}", self.value, self.comment)
    }
}

/// One decoded 80-byte header card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Keyword from bytes 0..8, trimmed.
    pub keyword: String,
    pub value: HeaderValue,
}

impl Card {
    /// Returns `true` if this card terminates the header.
    pub fn is_end(&self) -> bool {
        self.keyword == END_KEYWORD
    }
}

// ── Parsing ──

/// Parse a single 80-byte FITS header card.
///
/// Bytes 0..8 hold the keyword and byte 8 the separator, which is skipped
/// without inspection. Bytes 9..80 are split at the *last* `"/ "`: the part
/// before is the value, the part after the slash the comment. Both are
/// trimmed. Without a divider the whole field is the value.
pub fn parse_card(card_bytes: &[u8; CARD_SIZE]) -> Card {
    let keyword = String::from_utf8_lossy(&card_bytes[..8]).trim().to_string();
    let field = String::from_utf8_lossy(&card_bytes[9..CARD_SIZE]);

    let (value, comment) = match field.rfind(COMMENT_DIVIDER) {
        Some(idx) => (&field[..idx], field[idx + 1..].trim()),
        None => (&field[..], ""),
    };

    Card {
        keyword,
        value: HeaderValue::new(value.trim(), comment),
    }
}

// ── Header map ──

/// The ordered keyword → value mapping of one unit.
///
/// Insertion order is preserved. Inserting a keyword that is already present
/// appends the new value to the old one, separated by a newline, so
/// repeated cards such as `COMMENT` or `HISTORY` are never lost.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    entries: Vec<(String, HeaderValue)>,
}

impl Header {
    pub fn new() -> Self {
        Header::default()
    }

    /// Insert a card value, appending to an existing entry for `keyword`.
    pub fn insert(&mut self, keyword: impl Into<String>, value: HeaderValue) {
        let keyword = keyword.into();
        match self.entries.iter_mut().find(|(k, _)| *k == keyword) {
            Some((_, existing)) => {
                existing.append("\n");
                existing.append(value.value());
            }
            None => self.entries.push((keyword, value)),
        }
    }

    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// Number of distinct keywords.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keywords in insertion order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Read an integer keyword, falling back to `default` when it is absent.
    ///
    /// A present value that does not parse as an integer is a format error.
    pub fn integer_or(&self, keyword: &str, default: i64) -> Result<i64> {
        match self.get(keyword) {
            None => Ok(default),
            Some(v) => v.as_integer().ok_or_else(|| Error::InvalidValue {
                keyword: keyword.to_string(),
                value: v.value().to_string(),
            }),
        }
    }

    /// Like [`Header::integer_or`], but also rejects negative values.
    pub fn count_or(&self, keyword: &str, default: usize) -> Result<usize> {
        let n = self.integer_or(keyword, default as i64)?;
        usize::try_from(n).map_err(|_| Error::InvalidValue {
            keyword: keyword.to_string(),
            value: n.to_string(),
        })
    }
}

impl<'a> IntoIterator for &'a Header {
    type Item = (&'a str, &'a HeaderValue);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a HeaderValue)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn make_card(s: &str) -> [u8; CARD_SIZE] {
        let mut buf = [b' '; CARD_SIZE];
        let bytes = s.as_bytes();
        let len = bytes.len().min(CARD_SIZE);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    #[test]
    fn parse_card_integer_with_comment() {
        let c = parse_card(&make_card("BITPIX  =                   16 / bits per pixel"));
        assert_eq!(c.keyword, "BITPIX");
        assert_eq!(c.value.value(), "16");
        assert_eq!(c.value.comment(), "bits per pixel");
        assert_eq!(c.value.as_integer(), Some(16));
    }

    #[test]
    fn parse_card_without_comment() {
        let c = parse_card(&make_card("NAXIS   =                    2"));
        assert_eq!(c.value.value(), "2");
        assert_eq!(c.value.comment(), "");
    }

    #[test]
    fn parse_card_splits_on_last_divider() {
        let c = parse_card(&make_card("OBJECT  = 'a/ b'  / the name"));
        assert_eq!(c.value.value(), "'a/ b'");
        assert_eq!(c.value.comment(), "the name");
    }

    #[test]
    fn parse_card_slash_without_space_is_value() {
        let c = parse_card(&make_card("DATE    = '2024/01/15'"));
        assert_eq!(c.value.value(), "'2024/01/15'");
        assert_eq!(c.value.comment(), "");
    }

    #[test]
    fn parse_card_separator_byte_is_not_checked() {
        let c = parse_card(&make_card("SIMPLE  X                    T"));
        assert_eq!(c.keyword, "SIMPLE");
        assert_eq!(c.value.as_logical(), Some(true));
    }

    #[test]
    fn parse_card_end() {
        let c = parse_card(&make_card("END"));
        assert!(c.is_end());
        assert_eq!(c.value.value(), "");
    }

    #[test]
    fn parse_card_blank() {
        let c = parse_card(&[b' '; CARD_SIZE]);
        assert_eq!(c.keyword, "");
        assert!(!c.is_end());
    }

    #[test]
    fn parse_card_commentary_text() {
        let c = parse_card(&make_card("COMMENT   free text here"));
        assert_eq!(c.keyword, "COMMENT");
        assert_eq!(c.value.value(), "free text here");
    }

    #[test]
    fn as_str_strips_quotes() {
        assert_eq!(HeaderValue::new("'IMAGE   '", "").as_str(), "IMAGE");
        assert_eq!(HeaderValue::new("IMAGE", "").as_str(), "IMAGE");
        assert_eq!(HeaderValue::new("'it''s'", "").as_str(), "it's");
        assert_eq!(HeaderValue::new("'", "").as_str(), "'");
    }

    #[test]
    fn as_logical_values() {
        assert_eq!(HeaderValue::new("T", "").as_logical(), Some(true));
        assert_eq!(HeaderValue::new("F", "").as_logical(), Some(false));
        assert_eq!(HeaderValue::new("1", "").as_logical(), None);
    }

    #[test]
    fn append_keeps_comment() {
        let mut v = HeaderValue::new("abc", "first");
        v.append("def");
        assert_eq!(v.value(), "abcdef");
        assert_eq!(v.comment(), "first");
        assert_eq!(v.to_string_with_comment(), "abcdef / first");
    }

    #[test]
    fn header_preserves_insertion_order() {
        let mut h = Header::new();
        h.insert("SIMPLE", HeaderValue::new("T", ""));
        h.insert("BITPIX", HeaderValue::new("8", ""));
        h.insert("NAXIS", HeaderValue::new("0", ""));
        let keys: Vec<&str> = h.keywords().collect();
        assert_eq!(keys, ["SIMPLE", "BITPIX", "NAXIS"]);
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn header_repeated_keyword_appends() {
        let mut h = Header::new();
        h.insert("HISTORY", HeaderValue::new("first line", "c1"));
        h.insert("OBJECT", HeaderValue::new("'M31'", ""));
        h.insert("HISTORY", HeaderValue::new("second line", "c2"));
        assert_eq!(h.len(), 2);
        let hist = h.get("HISTORY").unwrap();
        assert_eq!(hist.value(), "first line\nsecond line");
        assert_eq!(hist.comment(), "c1");
        let keys: Vec<&str> = h.keywords().collect();
        assert_eq!(keys, ["HISTORY", "OBJECT"]);
    }

    #[test]
    fn integer_or_defaults_and_errors() {
        let mut h = Header::new();
        h.insert("NAXIS", HeaderValue::new("3", ""));
        h.insert("BAD", HeaderValue::new("'x'", ""));
        h.insert("NEG", HeaderValue::new("-4", ""));
        assert_eq!(h.integer_or("NAXIS", 0).unwrap(), 3);
        assert_eq!(h.integer_or("GCOUNT", 1).unwrap(), 1);
        assert!(matches!(
            h.integer_or("BAD", 0),
            Err(Error::InvalidValue { .. })
        ));
        assert_eq!(h.integer_or("NEG", 0).unwrap(), -4);
        assert!(h.count_or("NEG", 0).is_err());
        assert_eq!(h.count_or("NAXIS", 0).unwrap(), 3);
    }

    #[test]
    fn iterate_by_reference() {
        let mut h = Header::new();
        h.insert("A", HeaderValue::new("1", ""));
        h.insert("B", HeaderValue::new("2", ""));
        let pairs: Vec<(&str, &str)> = (&h).into_iter().map(|(k, v)| (k, v.value())).collect();
        assert_eq!(pairs, [("A", "1"), ("B", "2")]);
    }
}
