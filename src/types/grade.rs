use std::fmt;

/// Column label for the residual share of a tract outside every graded polygon.
pub const UNASSIGNED_LABEL: &str = "U";

/// HOLC residential security grade, from "best" (A) to "hazardous" (D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HolcGrade {
    A,
    B,
    C,
    D,
}

impl HolcGrade {
    pub const ALL: [HolcGrade; 4] = [HolcGrade::A, HolcGrade::B, HolcGrade::C, HolcGrade::D];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            HolcGrade::A => "A",
            HolcGrade::B => "B",
            HolcGrade::C => "C",
            HolcGrade::D => "D",
        }
    }

    /// Parse a grade attribute value; anything outside A-D yields `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "A" | "a" => Some(HolcGrade::A),
            "B" | "b" => Some(HolcGrade::B),
            "C" | "c" => Some(HolcGrade::C),
            "D" | "d" => Some(HolcGrade::D),
            _ => None,
        }
    }
}

impl fmt::Display for HolcGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
