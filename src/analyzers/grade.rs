use serde::Serialize;
use std::fmt;

/// Clean-energy ratio band for a production/consumption ratio.
///
/// | Range        | Band     |
/// |--------------|----------|
/// | >= 0.8       | excelent |
/// | >= 0.6       | bun      |
/// | >= 0.4       | mediu    |
/// | < 0.4        | slab     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatioBand {
    Excelent,
    Bun,
    Mediu,
    Slab,
}

impl RatioBand {
    pub const ALL: [RatioBand; 4] = [
        RatioBand::Excelent,
        RatioBand::Bun,
        RatioBand::Mediu,
        RatioBand::Slab,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RatioBand::Excelent => "excelent",
            RatioBand::Bun => "bun",
            RatioBand::Mediu => "mediu",
            RatioBand::Slab => "slab",
        }
    }
}

impl fmt::Display for RatioBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn grade(ratio: f64) -> RatioBand {
    match ratio {
        r if r >= 0.8 => RatioBand::Excelent,
        r if r >= 0.6 => RatioBand::Bun,
        r if r >= 0.4 => RatioBand::Mediu,
        _ => RatioBand::Slab,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(grade(1.20), RatioBand::Excelent);
        assert_eq!(grade(0.80), RatioBand::Excelent);
        assert_eq!(grade(0.79), RatioBand::Bun);
        assert_eq!(grade(0.60), RatioBand::Bun);
        assert_eq!(grade(0.59), RatioBand::Mediu);
        assert_eq!(grade(0.40), RatioBand::Mediu);
        assert_eq!(grade(0.39), RatioBand::Slab);
        assert_eq!(grade(0.00), RatioBand::Slab);
        assert_eq!(grade(-1.0).to_string(), "slab");
    }
}
