use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static HEADER_DELIMITER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:I{1,4}|IV)\s*Year\s*(?:I{1,2})\s*Semester|[0-9]\s*-\s*[0-9]")
        .expect("header delimiter pattern")
});

static ROMAN_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(I{1,4}|IV)\s*Year\s*(I{1,2})\s*Semester").expect("roman header pattern")
});

static NUMERIC_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9])\s*-\s*([0-9])").expect("numeric header pattern"));

/// A (year, semester) designator. Zero in either slot means the header
/// named something outside the known numerals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SemesterKey {
    pub year: u8,
    pub sem: u8,
}

impl SemesterKey {
    pub fn new(year: u8, sem: u8) -> Self {
        Self { year, sem }
    }

    /// Usable as record context: a real year and a semester of 1 or 2.
    pub fn is_valid(&self) -> bool {
        self.year >= 1 && (1..=2).contains(&self.sem)
    }

    /// Mechanical advance: 1 -> 2 within a year, 2 -> next year's 1.
    pub fn advance(self) -> Self {
        if self.sem == 1 {
            Self::new(self.year, 2)
        } else {
            Self::new(self.year.saturating_add(1), 1)
        }
    }

    /// Year clamped to the final year of a four-year program.
    pub fn clamped(self) -> Self {
        Self::new(self.year.min(4), self.sem)
    }

    pub fn label(&self) -> String {
        match (roman(self.year), roman(self.sem)) {
            (Some(year), Some(sem)) if self.sem <= 2 => format!("{year} Year {sem} Semester"),
            _ => format!("Year {} Sem {}", self.year, self.sem),
        }
    }
}

impl fmt::Display for SemesterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.sem)
    }
}

fn roman(value: u8) -> Option<&'static str> {
    match value {
        1 => Some("I"),
        2 => Some("II"),
        3 => Some("III"),
        4 => Some("IV"),
        _ => None,
    }
}

fn roman_value(token: &str) -> u8 {
    match token.to_uppercase().as_str() {
        "I" => 1,
        "II" => 2,
        "III" => 3,
        "IV" => 4,
        _ => 0,
    }
}

/// Recognize a semester designator. The roman form wins over the numeric form.
pub fn parse_header(text: &str) -> Option<SemesterKey> {
    if let Some(caps) = ROMAN_HEADER.captures(text) {
        return Some(SemesterKey::new(roman_value(&caps[1]), roman_value(&caps[2])));
    }

    let caps = NUMERIC_HEADER.captures(text)?;
    let year = caps[1].parse().ok()?;
    let sem = caps[2].parse().ok()?;
    Some(SemesterKey::new(year, sem))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Section<'a> {
    Header(SemesterKey),
    Body(&'a str),
}

/// Split text on every header occurrence, keeping headers as delimiters in order.
pub fn split_sections(text: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut cursor = 0;

    for found in HEADER_DELIMITER.find_iter(text) {
        if found.start() > cursor {
            sections.push(Section::Body(&text[cursor..found.start()]));
        }
        if let Some(key) = parse_header(found.as_str()) {
            sections.push(Section::Header(key));
        }
        cursor = found.end();
    }

    if cursor < text.len() {
        sections.push(Section::Body(&text[cursor..]));
    }

    sections
}
