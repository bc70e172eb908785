use serde::{Deserialize, Serialize};

/// Letter grade on the 10-point scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    O,
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    D,
    F,
    Ab,
}

impl Grade {
    pub const ALL: [Grade; 9] = [
        Grade::O,
        Grade::APlus,
        Grade::A,
        Grade::BPlus,
        Grade::B,
        Grade::C,
        Grade::D,
        Grade::F,
        Grade::Ab,
    ];

    /// Exact symbol lookup. `AB`, `Absent` and `ABSENT` all mean absent.
    pub fn from_symbol(symbol: &str) -> Option<Grade> {
        let grade = match symbol {
            "O" => Grade::O,
            "A+" => Grade::APlus,
            "A" => Grade::A,
            "B+" => Grade::BPlus,
            "B" => Grade::B,
            "C" => Grade::C,
            "D" => Grade::D,
            "F" => Grade::F,
            "Ab" | "AB" | "Absent" | "ABSENT" => Grade::Ab,
            _ => return None,
        };
        Some(grade)
    }

    /// Case-insensitive parse used by the text scanner.
    pub fn normalize(raw: &str) -> Option<Grade> {
        Grade::from_symbol(&raw.trim().to_uppercase())
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Grade::O => "O",
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
            Grade::Ab => "Ab",
        }
    }

    pub fn points(self) -> u8 {
        match self {
            Grade::O => 10,
            Grade::APlus => 9,
            Grade::A => 8,
            Grade::BPlus => 7,
            Grade::B => 6,
            Grade::C => 5,
            Grade::D => 4,
            Grade::F | Grade::Ab => 0,
        }
    }

    pub fn is_backlog(self) -> bool {
        matches!(self, Grade::F | Grade::Ab)
    }
}

/// Grade points for a raw symbol; anything outside the vocabulary scores 0.
pub fn grade_points(symbol: &str) -> u8 {
    Grade::from_symbol(symbol).map(Grade::points).unwrap_or(0)
}
