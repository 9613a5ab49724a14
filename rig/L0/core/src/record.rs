//! Line-record field reading.
//!
//! Persisted rigs are stored one record per line: a single tag character
//! followed by whitespace-separated numeric fields. Readers are lenient in
//! the same way as C `scanf`: fields are consumed left to right and reading
//! stops at the first field that is missing or does not parse, so a record
//! with a truncated tail still yields its leading fields.

/// Split a record line into its tag and the remaining field text.
///
/// Returns `None` for empty lines.
#[must_use]
pub fn split_tag(line: &str) -> Option<(char, &str)> {
    let mut chars = line.chars();
    let tag = chars.next()?;
    Some((tag, chars.as_str()))
}

/// Sequential reader over the whitespace-separated fields of a record.
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    tokens: std::str::SplitWhitespace<'a>,
    parsed: usize,
    stopped: bool,
}

impl<'a> Fields<'a> {
    /// Read fields from `text` (the part of the line after the tag).
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            tokens: text.split_whitespace(),
            parsed: 0,
            stopped: false,
        }
    }

    /// Number of fields successfully read so far.
    #[must_use]
    pub const fn parsed(&self) -> usize {
        self.parsed
    }

    fn next_parsed<T: std::str::FromStr>(&mut self) -> Option<T> {
        if self.stopped {
            return None;
        }
        let value = self.tokens.next().and_then(|t| t.parse().ok());
        match value {
            Some(v) => {
                self.parsed += 1;
                Some(v)
            }
            None => {
                self.stopped = true;
                None
            }
        }
    }

    /// Next field as a float.
    pub fn float(&mut self) -> Option<f64> {
        self.next_parsed()
    }

    /// Next field as a signed integer.
    pub fn int(&mut self) -> Option<i64> {
        self.next_parsed()
    }

    /// Next field as an index; negative values read as `None` but still
    /// count as parsed.
    pub fn index(&mut self) -> Option<Option<usize>> {
        self.int().map(|i| usize::try_from(i).ok())
    }

    /// Next `N` floats, or `None` if any is missing.
    pub fn floats<const N: usize>(&mut self) -> Option<[f64; N]> {
        let mut out = [0.0; N];
        for v in &mut out {
            *v = self.float()?;
        }
        Some(out)
    }

    /// Next field as an unparsed word.
    pub fn word(&mut self) -> Option<&'a str> {
        if self.stopped {
            return None;
        }
        let word = self.tokens.next();
        match word {
            Some(_) => self.parsed += 1,
            None => self.stopped = true,
        }
        word
    }
}

/// Format a float for persistence with enough digits to round-trip.
#[must_use]
pub fn fmt_float(v: f64) -> String {
    format!("{v}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tag() {
        assert_eq!(split_tag("d 1 2 3.5"), Some(('d', " 1 2 3.5")));
        assert_eq!(split_tag(""), None);
    }

    #[test]
    fn test_stops_at_first_bad_field() {
        let mut f = Fields::new(" 1 2 x 4");
        assert_eq!(f.int(), Some(1));
        assert_eq!(f.float(), Some(2.0));
        assert_eq!(f.float(), None);
        // Later fields are not read once a field failed
        assert_eq!(f.float(), None);
        assert_eq!(f.parsed(), 2);
    }

    #[test]
    fn test_truncated_record() {
        let mut f = Fields::new("3 4");
        assert_eq!(f.floats::<3>(), None);
        assert_eq!(f.parsed(), 2);
    }

    #[test]
    fn test_negative_index() {
        let mut f = Fields::new("-1 5");
        assert_eq!(f.index(), Some(None));
        assert_eq!(f.index(), Some(Some(5)));
        assert_eq!(f.parsed(), 2);
    }

    #[test]
    fn test_word_and_float_roundtrip() {
        let mut f = Fields::new(" 2.5 models/body.iqm ");
        assert_eq!(f.float(), Some(2.5));
        assert_eq!(f.word(), Some("models/body.iqm"));

        let v = 0.1 + 0.2;
        assert_eq!(fmt_float(v).parse::<f64>().ok(), Some(v));
    }
}
