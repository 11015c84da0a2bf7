//! Code-range expansion for hierarchical classifications.
//!
//! Two schemes exist:
//! - numeric: zero-padded 3-digit codes (`001-139`), used by CID-9 categories
//!   and pre-2002 occupation groups;
//! - alphanumeric: a letter and two digits with an optional `.subnumber`
//!   (`A00-B99`, `A00.1`), used by CID-10.
//!
//! Expansion of an alphanumeric range walks `A00, A01, .., A99, B00, ..` and
//! stops at `Z99` at the latest, so it always terminates.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use sus_model::MAX_CATEGORY_LEVELS;

use crate::error::{Result, StandardsError};

/// Letter, two digits and an optional subnumber: `A00`, `A00.1`.
static CID10_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z])(\d{2})(?:\.(\d{1,2}))?$").expect("Invalid CID-10 code regex")
});

const NUMERIC_WIDTH: usize = 3;
const NUMERIC_MAX: u16 = 999;
const LAST_LETTER: u8 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeScheme {
    Numeric,
    Alphanumeric,
}

/// A CID-10 code: letter, two-digit number and optional subnumber.
///
/// Ordering is by letter, then number, then subnumber (a code without a
/// subnumber sorts before its subdivisions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid10Code {
    letter: u8,
    number: u8,
    sub: Option<u8>,
}

impl Cid10Code {
    pub fn parse(code: &str) -> Result<Self> {
        let caps = CID10_CODE
            .captures(code.trim())
            .ok_or_else(|| StandardsError::invalid_code(code, "expected a letter and two digits"))?;
        let letter = caps[1].as_bytes()[0] - b'A';
        let number = caps[2]
            .parse::<u8>()
            .map_err(|e| StandardsError::invalid_code(code, e.to_string()))?;
        let sub = caps
            .get(3)
            .map(|m| m.as_str().parse::<u8>())
            .transpose()
            .map_err(|e| StandardsError::invalid_code(code, e.to_string()))?;
        Ok(Self {
            letter,
            number,
            sub,
        })
    }

    pub fn letter(&self) -> char {
        char::from(b'A' + self.letter)
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    /// Category-level code without the subnumber (`A00.1` -> `A00`).
    pub fn category(&self) -> Self {
        Self { sub: None, ..*self }
    }

    /// The following category-level code; `None` after `Z99`.
    pub fn next(&self) -> Option<Self> {
        if self.number < 99 {
            Some(Self {
                letter: self.letter,
                number: self.number + 1,
                sub: None,
            })
        } else if self.letter < LAST_LETTER {
            Some(Self {
                letter: self.letter + 1,
                number: 0,
                sub: None,
            })
        } else {
            None
        }
    }

    /// Whether this code comes before `end` at category level, counting
    /// equality as preceding when `inclusive`.
    pub fn precedes(&self, end: &Self, inclusive: bool) -> bool {
        match (self.letter, self.number).cmp(&(end.letter, end.number)) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Equal => inclusive,
            std::cmp::Ordering::Greater => false,
        }
    }
}

impl fmt::Display for Cid10Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.letter(), self.number)?;
        if let Some(sub) = self.sub {
            write!(f, ".{sub}")?;
        }
        Ok(())
    }
}

/// An inclusive interval of classification codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeRange {
    Numeric { start: u16, end: u16 },
    Alphanumeric { start: Cid10Code, end: Cid10Code },
}

impl CodeRange {
    /// Parse `start-end` or a single code in the given scheme.
    pub fn parse(range: &str, scheme: CodeScheme) -> Result<Self> {
        let range = range.trim();
        let (start, end) = range.split_once('-').unwrap_or((range, range));
        let parsed = match scheme {
            CodeScheme::Numeric => Self::Numeric {
                start: parse_numeric(start.trim(), range)?,
                end: parse_numeric(end.trim(), range)?,
            },
            CodeScheme::Alphanumeric => Self::Alphanumeric {
                start: Cid10Code::parse(start)?.category(),
                end: Cid10Code::parse(end)?.category(),
            },
        };
        let ordered = match parsed {
            Self::Numeric { start, end } => start <= end,
            Self::Alphanumeric { start, end } => start.precedes(&end, true),
        };
        if !ordered {
            return Err(StandardsError::invalid_range(range, "end precedes start"));
        }
        Ok(parsed)
    }

    /// Every code in the interval, in order.
    pub fn codes(&self) -> Vec<String> {
        match *self {
            Self::Numeric { start, end } => (start..=end)
                .map(|code| format!("{code:0width$}", width = NUMERIC_WIDTH))
                .collect(),
            Self::Alphanumeric { start, end } => {
                let mut codes = Vec::new();
                let mut current = Some(start);
                while let Some(code) = current
                    && code.precedes(&end, true)
                {
                    codes.push(code.to_string());
                    current = code.next();
                }
                codes
            }
        }
    }
}

fn parse_numeric(code: &str, range: &str) -> Result<u16> {
    if code.len() != NUMERIC_WIDTH || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StandardsError::invalid_range(
            range,
            format!("{code:?} is not a 3-digit code"),
        ));
    }
    code.parse::<u16>()
        .ok()
        .filter(|value| *value <= NUMERIC_MAX)
        .ok_or_else(|| StandardsError::invalid_range(range, format!("{code:?} is out of range")))
}

/// Expand `(range_id, title)` pairs into code -> `"{range_id}: {title}"`.
///
/// Later ranges overwrite earlier ones for codes they share.
pub fn expand_titled<'a, I>(ranges: I, scheme: CodeScheme) -> Result<BTreeMap<String, String>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut lookup = BTreeMap::new();
    for (range_id, title) in ranges {
        let label = format!("{range_id}: {title}");
        for code in CodeRange::parse(range_id, scheme)?.codes() {
            lookup.insert(code, label.clone());
        }
    }
    Ok(lookup)
}

/// Code -> nested category labels, broadest first.
///
/// Ranges are applied in input order and the n-th range containing a code
/// becomes its category level n.
#[derive(Debug, Clone, Default)]
pub struct CategoryLookup {
    categories: HashMap<String, Vec<String>>,
}

impl CategoryLookup {
    pub fn build<'a, I>(ranges: I, scheme: CodeScheme) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut categories: HashMap<String, Vec<String>> = HashMap::new();
        for (range_id, title) in ranges {
            let label = format!("{range_id}: {title}");
            for code in CodeRange::parse(range_id, scheme)?.codes() {
                let levels = categories.entry(code.clone()).or_default();
                if levels.len() == MAX_CATEGORY_LEVELS {
                    return Err(StandardsError::TooManyLevels {
                        code,
                        limit: MAX_CATEGORY_LEVELS,
                    });
                }
                levels.push(label.clone());
            }
        }
        Ok(Self { categories })
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Categories of `code`, broadest first.
    pub fn categories(&self, code: &str) -> Option<&[String]> {
        self.categories.get(code).map(Vec::as_slice)
    }

    /// Code -> label for one level (1-based).
    pub fn level(&self, level: usize) -> BTreeMap<&str, &str> {
        self.categories
            .iter()
            .filter_map(|(code, labels)| {
                let label = level.checked_sub(1).and_then(|idx| labels.get(idx))?;
                Some((code.as_str(), label.as_str()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_range_expands_with_padding() {
        let lookup =
            expand_titled([("001-139", "Doenças infecciosas e parasitárias")], CodeScheme::Numeric)
                .expect("expand");
        assert_eq!(lookup.len(), 139);
        assert_eq!(
            lookup.get("001").map(String::as_str),
            Some("001-139: Doenças infecciosas e parasitárias")
        );
        assert!(lookup.contains_key("139"));
        assert!(!lookup.contains_key("140"));
    }

    #[test]
    fn single_numeric_code() {
        let range = CodeRange::parse("123", CodeScheme::Numeric).expect("parse");
        assert_eq!(range.codes(), vec!["123"]);
    }

    #[test]
    fn reversed_range_is_an_error() {
        let err = CodeRange::parse("139-001", CodeScheme::Numeric).unwrap_err();
        assert!(matches!(err, StandardsError::InvalidRange { .. }));
        let err = CodeRange::parse("B00-A99", CodeScheme::Alphanumeric).unwrap_err();
        assert!(matches!(err, StandardsError::InvalidRange { .. }));
    }

    #[test]
    fn malformed_codes_are_errors() {
        assert!(CodeRange::parse("01-139", CodeScheme::Numeric).is_err());
        assert!(CodeRange::parse("AA0-B99", CodeScheme::Alphanumeric).is_err());
        assert!(Cid10Code::parse("a00").is_err());
    }

    #[test]
    fn alphanumeric_rolls_over_letters() {
        let range = CodeRange::parse("A98-B01", CodeScheme::Alphanumeric).expect("parse");
        assert_eq!(range.codes(), vec!["A98", "A99", "B00", "B01"]);
    }

    #[test]
    fn enumeration_stops_at_z99() {
        let range = CodeRange::parse("Z98-Z99", CodeScheme::Alphanumeric).expect("parse");
        assert_eq!(range.codes(), vec!["Z98", "Z99"]);
        let last = Cid10Code::parse("Z99").expect("parse");
        assert!(last.next().is_none());
    }

    #[test]
    fn ordering_and_bounds() {
        let a00 = Cid10Code::parse("A00").expect("parse");
        let a001 = Cid10Code::parse("A00.1").expect("parse");
        let b00 = Cid10Code::parse("B00").expect("parse");
        assert!(a00 < a001);
        assert!(a001 < b00);
        assert!(a00.precedes(&a001, true));
        assert!(!a00.precedes(&a001, false));
        assert!(a001.precedes(&b00, false));
        assert_eq!(a001.to_string(), "A00.1");
        assert_eq!(a001.category().to_string(), "A00");
    }

    #[test]
    fn nested_categories_follow_input_order() {
        let lookup = CategoryLookup::build(
            [
                ("A00-B99", "Algumas doenças infecciosas e parasitárias"),
                ("A00-A09", "Doenças infecciosas intestinais"),
            ],
            CodeScheme::Alphanumeric,
        )
        .expect("build");
        let categories = lookup.categories("A05").expect("A05");
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[1], "A00-A09: Doenças infecciosas intestinais");
        assert_eq!(lookup.categories("B10").map(<[String]>::len), Some(1));
        assert_eq!(lookup.level(2).len(), 10);
        assert_eq!(lookup.level(1).len(), 200);
    }

    #[test]
    fn more_than_four_levels_fails() {
        let ranges = [
            ("A00-A99", "1"),
            ("A00-A50", "2"),
            ("A00-A10", "3"),
            ("A00-A05", "4"),
            ("A00-A01", "5"),
        ];
        let err = CategoryLookup::build(ranges, CodeScheme::Alphanumeric).unwrap_err();
        assert!(matches!(err, StandardsError::TooManyLevels { .. }));
    }
}
