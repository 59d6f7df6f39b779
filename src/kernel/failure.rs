// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Numeric failure codes raised by the modeling kernel.
//!
//! Modeling operations signal failure by throwing one of these codes into the
//! script. The fast kernel only carries the number; the diagnostic kernel can
//! translate it into a message through its `describe_failure` export.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCode {
    InvalidDimension,
    InvalidArgument,
    DegenerateProfile,
    EmptyCompound,
    TessellationBudget,
    InvalidAxis,
    UnsupportedOperation,
}

impl FailureCode {
    pub const ALL: [FailureCode; 7] = [
        FailureCode::InvalidDimension,
        FailureCode::InvalidArgument,
        FailureCode::DegenerateProfile,
        FailureCode::EmptyCompound,
        FailureCode::TessellationBudget,
        FailureCode::InvalidAxis,
        FailureCode::UnsupportedOperation,
    ];

    pub fn code(self) -> i32 {
        match self {
            FailureCode::InvalidDimension => 1,
            FailureCode::InvalidArgument => 2,
            FailureCode::DegenerateProfile => 3,
            FailureCode::EmptyCompound => 4,
            FailureCode::TessellationBudget => 5,
            FailureCode::InvalidAxis => 6,
            FailureCode::UnsupportedOperation => 7,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|failure| failure.code() == code)
    }

    /// Message embedded in the diagnostic kernel's data segment.
    pub fn description(self) -> &'static str {
        match self {
            FailureCode::InvalidDimension => "Dimensions must be positive finite numbers",
            FailureCode::InvalidArgument => "Invalid argument passed to a modeling operation",
            FailureCode::DegenerateProfile => {
                "Profile is degenerate: it needs at least three distinct points enclosing an area"
            }
            FailureCode::EmptyCompound => "Cannot build a compound from an empty list of shapes",
            FailureCode::TessellationBudget => {
                "Tessellation budget exceeded: loosen the tolerance or reduce the model size"
            }
            FailureCode::InvalidAxis => "Rotation axis must be a non-zero vector",
            FailureCode::UnsupportedOperation => "Operation is not supported for this shape",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.description(), self.code())
    }
}

impl std::error::Error for FailureCode {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip_and_are_unique() {
        for failure in FailureCode::ALL {
            assert_eq!(FailureCode::from_code(failure.code()), Some(failure));
        }
        assert_eq!(FailureCode::from_code(0), None);
        assert_eq!(FailureCode::from_code(99), None);
    }

    #[test]
    fn test_descriptions_are_embeddable() {
        for failure in FailureCode::ALL {
            let text = failure.description();
            assert!(text.is_ascii());
            assert!(!text.contains('"') && !text.contains('\\'));
        }
    }
}
