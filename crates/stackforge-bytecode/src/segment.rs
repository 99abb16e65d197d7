//! Virtual memory segments addressed by `push`/`pop` (§4.5, §6).

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Constant,
    Local,
    Argument,
    This,
    That,
    Temp,
    Pointer,
    Static,
}

impl Segment {
    pub fn as_str(self) -> &'static str {
        match self {
            Segment::Constant => "constant",
            Segment::Local => "local",
            Segment::Argument => "argument",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Temp => "temp",
            Segment::Pointer => "pointer",
            Segment::Static => "static",
        }
    }

    /// The base-address symbol of the segments that are addressed
    /// indirectly through a pointer held in RAM (local/argument/this/that).
    pub fn base_symbol(self) -> Option<&'static str> {
        match self {
            Segment::Local => Some("LCL"),
            Segment::Argument => Some("ARG"),
            Segment::This => Some("THIS"),
            Segment::That => Some("THAT"),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("unknown segment: {0}")]
pub struct UnknownSegment(pub String);

impl FromStr for Segment {
    type Err = UnknownSegment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "constant" => Segment::Constant,
            "local" => Segment::Local,
            "argument" => Segment::Argument,
            "this" => Segment::This,
            "that" => Segment::That,
            "temp" => Segment::Temp,
            "pointer" => Segment::Pointer,
            "static" => Segment::Static,
            other => return Err(UnknownSegment(other.to_owned())),
        })
    }
}
