use chrono::{DateTime, Utc};
use interim::{parse_date_string, Dialect};

/// Best-effort resolution of a natural-language time expression relative to
/// `now`. Implementations must be total: anything unintelligible is None,
/// never an error.
pub trait TimeParser: Send + Sync {
    fn parse(&self, expr: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// English-dialect parser for expressions like "tomorrow 9am" or
/// "next friday".
pub struct NaturalTimeParser;

impl TimeParser for NaturalTimeParser {
    fn parse(&self, expr: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        parse_date_string(expr.trim(), now, Dialect::Us).ok()
    }
}
