//! Range-spec parsers for `ZRANGEBYSCORE`- and `ZRANGEBYLEX`-style queries
//! over the `KEY_ZSET_SORT` keyspace.
//!
//! `-inf`/`+inf` sentinels map onto `f64::NEG_INFINITY`/`f64::INFINITY`
//! rather than a `DBL_MAX`-style stand-in, since Rust's float comparisons
//! already treat infinities correctly.

use crate::error::{Result, StorageError};

/// A parsed score range: `(min, max)` each with its own inclusive/exclusive flag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZRangeSpec {
    pub min: f64,
    pub max: f64,
    pub contain_min: bool,
    pub contain_max: bool,
}

impl ZRangeSpec {
    pub fn parse(min: &str, max: &str) -> Result<Self> {
        let (min_val, contain_min) = parse_score(min)?;
        let (max_val, contain_max) = parse_score(max)?;
        if min_val > max_val {
            return Err(StorageError::InvalidArgument(format!(
                "score range min > max: {min:?} > {max:?}"
            )));
        }
        Ok(ZRangeSpec { min: min_val, max: max_val, contain_min, contain_max })
    }

    /// Whether `score` falls within the parsed bounds.
    pub fn contains(&self, score: f64) -> bool {
        let above_min = if self.contain_min { score >= self.min } else { score > self.min };
        let below_max = if self.contain_max { score <= self.max } else { score < self.max };
        above_min && below_max
    }
}

fn parse_score(token: &str) -> Result<(f64, bool)> {
    let (body, inclusive) = match token.strip_prefix('(') {
        Some(rest) => (rest, false),
        None => (token, true),
    };
    let value = match body {
        "-inf" | "-Inf" | "-INF" => f64::NEG_INFINITY,
        "+inf" | "+Inf" | "+INF" | "inf" => f64::INFINITY,
        other => other
            .parse::<f64>()
            .map_err(|_| StorageError::InvalidArgument(format!("not a valid score: {token:?}")))?,
    };
    Ok((value, inclusive))
}

/// A parsed lexicographic range for members of equal score.
#[derive(Clone, Debug, PartialEq)]
pub enum LexBound {
    NegInfinity,
    PosInfinity,
    Bounded { value: Vec<u8>, inclusive: bool },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ZLexRangeSpec {
    pub min: LexBound,
    pub max: LexBound,
}

impl ZLexRangeSpec {
    pub fn parse(min: &str, max: &str) -> Result<Self> {
        let min_bound = parse_lex_bound(min)?;
        let max_bound = parse_lex_bound(max)?;
        // The open `+` upper bound is exempt: nothing sorts above it.
        if !matches!(max_bound, LexBound::PosInfinity)
            && lex_sort_bytes(&min_bound) > lex_sort_bytes(&max_bound)
        {
            return Err(StorageError::InvalidArgument(format!(
                "lex range min > max: {min:?} > {max:?}"
            )));
        }
        Ok(ZLexRangeSpec { min: min_bound, max: max_bound })
    }

    pub fn contains(&self, member: &[u8]) -> bool {
        let above_min = match &self.min {
            LexBound::NegInfinity => true,
            LexBound::PosInfinity => false,
            LexBound::Bounded { value, inclusive } => {
                if *inclusive {
                    member >= value.as_slice()
                } else {
                    member > value.as_slice()
                }
            }
        };
        let below_max = match &self.max {
            LexBound::PosInfinity => true,
            LexBound::NegInfinity => false,
            LexBound::Bounded { value, inclusive } => {
                if *inclusive {
                    member <= value.as_slice()
                } else {
                    member < value.as_slice()
                }
            }
        };
        above_min && below_max
    }
}

/// The bytes each bound sorts by, for the pre-parse ordering check.
fn lex_sort_bytes(bound: &LexBound) -> &[u8] {
    match bound {
        LexBound::NegInfinity | LexBound::PosInfinity => &[],
        LexBound::Bounded { value, .. } => value,
    }
}

fn parse_lex_bound(token: &str) -> Result<LexBound> {
    if token == "-" {
        return Ok(LexBound::NegInfinity);
    }
    if token == "+" {
        return Ok(LexBound::PosInfinity);
    }
    if let Some(rest) = token.strip_prefix('[') {
        return Ok(LexBound::Bounded { value: rest.as_bytes().to_vec(), inclusive: true });
    }
    if let Some(rest) = token.strip_prefix('(') {
        return Ok(LexBound::Bounded { value: rest.as_bytes().to_vec(), inclusive: false });
    }
    Err(StorageError::InvalidArgument(format!(
        "lex range bound must start with '-', '+', '[' or '(': {token:?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inf_sentinels() {
        let spec = ZRangeSpec::parse("-inf", "+inf").unwrap();
        assert_eq!(spec.min, f64::NEG_INFINITY);
        assert_eq!(spec.max, f64::INFINITY);
        assert!(spec.contain_min && spec.contain_max);
    }

    #[test]
    fn parses_exclusive_bounds() {
        let spec = ZRangeSpec::parse("(1", "(5").unwrap();
        assert_eq!(spec.min, 1.0);
        assert_eq!(spec.max, 5.0);
        assert!(!spec.contain_min && !spec.contain_max);
        assert!(!spec.contains(1.0));
        assert!(spec.contains(2.0));
        assert!(!spec.contains(5.0));
    }

    #[test]
    fn rejects_malformed_score() {
        assert!(ZRangeSpec::parse("nope", "5").is_err());
    }

    #[test]
    fn rejects_inverted_score_range() {
        assert!(ZRangeSpec::parse("3", "2").is_err());
    }

    #[test]
    fn lex_range_bounds() {
        let spec = ZLexRangeSpec::parse("[a", "(c").unwrap();
        assert!(spec.contains(b"a"));
        assert!(spec.contains(b"b"));
        assert!(!spec.contains(b"c"));
    }

    #[test]
    fn lex_range_infinities() {
        let spec = ZLexRangeSpec::parse("-", "+").unwrap();
        assert!(spec.contains(b""));
        assert!(spec.contains(b"\xff\xff"));
    }

    #[test]
    fn lex_range_rejects_bad_prefix() {
        assert!(ZLexRangeSpec::parse("a", "+").is_err());
    }

    #[test]
    fn lex_range_rejects_inverted_bounds() {
        assert!(ZLexRangeSpec::parse("[z", "(a").is_err());
    }

    #[test]
    fn lex_range_open_max_bound_exempts_the_ordering_check() {
        assert!(ZLexRangeSpec::parse("[z", "+").is_ok());
    }
}
