use anyhow::{Result, anyhow};

pub const SINHALA_START: char = '\u{0D80}';
pub const SINHALA_END: char = '\u{0DFF}';

/// Checks text for codepoints inside one inclusive Unicode range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptDetector {
    start: char,
    end: char,
}

impl Default for ScriptDetector {
    fn default() -> Self {
        Self::sinhala()
    }
}

impl ScriptDetector {
    pub fn sinhala() -> Self {
        Self {
            start: SINHALA_START,
            end: SINHALA_END,
        }
    }

    pub fn new(start: char, end: char) -> Result<Self> {
        if start > end {
            return Err(anyhow!(
                "script range is inverted: U+{:04X} > U+{:04X}",
                start as u32,
                end as u32
            ));
        }
        Ok(Self { start, end })
    }

    /// Parses a range given as hex codepoints, with or without a `U+` prefix.
    pub fn from_hex(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_codepoint(start)?, parse_codepoint(end)?)
    }

    pub fn start(&self) -> char {
        self.start
    }

    pub fn end(&self) -> char {
        self.end
    }

    pub fn contains_target_script(&self, text: &str) -> bool {
        text.chars().any(|c| (self.start..=self.end).contains(&c))
    }
}

fn parse_codepoint(raw: &str) -> Result<char> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("U+")
        .or_else(|| trimmed.strip_prefix("u+"))
        .or_else(|| trimmed.strip_prefix("0x"))
        .unwrap_or(trimmed);
    let value = u32::from_str_radix(digits, 16)
        .map_err(|err| anyhow!("invalid codepoint '{}': {}", raw, err))?;
    char::from_u32(value).ok_or_else(|| anyhow!("invalid codepoint '{}'", raw))
}
