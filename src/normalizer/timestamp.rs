use chrono::NaiveDateTime;

/// Accepted input layouts, tried in order; the first that parses wins.
pub const DEFAULT_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    // JLECmd writes seven fractional digits.
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.fZ",
];

pub const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedTimestamp {
    /// Re-rendered as `YYYY-MM-DDTHH:MM:SSZ`.
    Normalized(String),
    /// No format matched; the trimmed input is kept as-is.
    Raw(String),
}

impl ParsedTimestamp {
    pub fn into_string(self) -> String {
        match self {
            ParsedTimestamp::Normalized(value) | ParsedTimestamp::Raw(value) => value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimestampParser {
    formats: Vec<String>,
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self::new(DEFAULT_FORMATS.iter().map(|f| f.to_string()))
    }
}

impl TimestampParser {
    pub fn new(formats: impl IntoIterator<Item = String>) -> Self {
        Self {
            formats: formats.into_iter().collect(),
        }
    }

    /// Append a format tried after the existing ones.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.formats.push(format.into());
        self
    }

    pub fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        self.formats
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    }

    /// `None` for blank input.
    pub fn normalize(&self, value: &str) -> Option<ParsedTimestamp> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match self.parse(trimmed) {
            Some(parsed) => ParsedTimestamp::Normalized(parsed.format(OUTPUT_FORMAT).to_string()),
            None => ParsedTimestamp::Raw(trimmed.to_string()),
        })
    }
}
