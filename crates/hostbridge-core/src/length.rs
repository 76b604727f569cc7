//! Variant length values: a number, a parsed dimension string or a resource id.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Where a [`Length`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(i8)]
pub enum LengthKind {
    /// Unrecognized or null host value.
    Undefined = 0,
    Number = 1,
    String = 2,
    Resource = 3,
}

/// Dimension unit of a [`Length`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum LengthUnit {
    Px = 0,
    Vp = 1,
    Fp = 2,
    Percent = 3,
    Lpx = 4,
}

impl Default for LengthKind {
    fn default() -> Self {
        LengthKind::Undefined
    }
}

impl Default for LengthUnit {
    fn default() -> Self {
        LengthUnit::Px
    }
}

impl LengthUnit {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "px" => Some(LengthUnit::Px),
            "" | "vp" => Some(LengthUnit::Vp),
            "fp" => Some(LengthUnit::Fp),
            "%" => Some(LengthUnit::Percent),
            "lpx" => Some(LengthUnit::Lpx),
            _ => None,
        }
    }
}

/// A length argument as received by native code.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Length {
    pub kind: LengthKind,
    pub value: f32,
    pub unit: LengthUnit,
    pub resource: i32,
}

impl Length {
    /// A plain number, interpreted in virtual pixels.
    pub fn number(value: f32) -> Self {
        Self {
            kind: LengthKind::Number,
            value,
            unit: LengthUnit::Vp,
            resource: 0,
        }
    }

    pub fn resource(id: i32) -> Self {
        Self {
            kind: LengthKind::Resource,
            value: 0.0,
            unit: LengthUnit::Vp,
            resource: id,
        }
    }

    /// Parse a dimension string such as `"10px"`, `"5.5vp"`, `"50%"` or `"12"`.
    ///
    /// A bare number is in virtual pixels. Percentages are stored as fractions
    /// (`"50%"` yields `0.5`). Text that does not parse yields a zero-valued
    /// string length in virtual pixels.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let split = text
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
            .unwrap_or(text.len());
        let (number, suffix) = text.split_at(split);
        let parsed = number
            .parse::<f32>()
            .ok()
            .zip(LengthUnit::from_suffix(suffix.trim()));

        let (value, unit) = match parsed {
            Some((value, LengthUnit::Percent)) => (value / 100.0, LengthUnit::Percent),
            Some((value, unit)) => (value, unit),
            None => (0.0, LengthUnit::Vp),
        };
        Self {
            kind: LengthKind::String,
            value,
            unit,
            resource: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units() {
        assert_eq!(Length::parse("10px").unit, LengthUnit::Px);
        assert_eq!(Length::parse("10px").value, 10.0);
        assert_eq!(Length::parse("5.5vp").value, 5.5);
        assert_eq!(Length::parse("3fp").unit, LengthUnit::Fp);
        assert_eq!(Length::parse("2lpx").unit, LengthUnit::Lpx);
        assert_eq!(Length::parse("12").unit, LengthUnit::Vp);
        assert_eq!(Length::parse("12").kind, LengthKind::String);
    }

    #[test]
    fn percent_is_a_fraction() {
        let length = Length::parse("50%");
        assert_eq!(length.unit, LengthUnit::Percent);
        assert_eq!(length.value, 0.5);
    }

    #[test]
    fn garbage_is_zero() {
        let length = Length::parse("wide");
        assert_eq!(length.value, 0.0);
        assert_eq!(length.unit, LengthUnit::Vp);
        assert_eq!(Length::parse("10em").value, 0.0);
    }

    #[test]
    fn constructors() {
        assert_eq!(Length::number(4.0).kind, LengthKind::Number);
        assert_eq!(Length::resource(77).resource, 77);
        assert_eq!(Length::default().kind, LengthKind::Undefined);
    }
}
