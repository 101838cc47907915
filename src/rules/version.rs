//! Dotted numeric versions as they appear in emulator logs.
//!
//! Accepts two to four numeric components (`4.80`, `442.19`, `1.2.3.4`).
//! Missing trailing components compare as zero, so `4.8` equals `4.8.0`.
//! Component values compare as integers: `411.70` is newer than `411.7`.

use std::cmp::Ordering;
use std::fmt;

/// Maximum number of components accepted.
const MAX_COMPONENTS: usize = 4;

/// A parsed `major.minor[.build[.revision]]` version.
#[derive(Debug, Clone, Copy)]
pub struct DottedVersion {
    parts: [u32; MAX_COMPONENTS],
    len: usize,
}

impl DottedVersion {
    /// Version from explicit major and minor components.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            parts: [major, minor, 0, 0],
            len: 2,
        }
    }

    /// Parse a trimmed dotted string. Returns `None` for anything else.
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = [0u32; MAX_COMPONENTS];
        let mut len = 0usize;
        for component in input.trim().split('.') {
            if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let slot = parts.get_mut(len)?;
            *slot = component.parse().ok()?;
            len = len.saturating_add(1);
        }
        (len >= 2).then_some(Self { parts, len })
    }

    /// First component.
    pub fn major(&self) -> u32 {
        self.parts[0]
    }

    /// Second component.
    pub fn minor(&self) -> u32 {
        self.parts[1]
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for DottedVersion {}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.parts.get(..self.len).unwrap_or(&self.parts);
        for (i, part) in shown.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}
