use crate::error::ConfigError;
use chrono::NaiveTime;

/// A daily time window during which new entries are forbidden.
///
/// Windows are inclusive on both ends. A window whose `end` precedes its
/// `start` spans midnight and matches times on either side of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForbiddenWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ForbiddenWindow {
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= t && t <= self.end
        } else {
            t >= self.start || t <= self.end
        }
    }
}

/// Parses a semicolon-delimited "HH:MM-HH:MM" spec into windows.
///
/// An empty spec yields no windows; any malformed segment is a configuration
/// error rather than being silently dropped.
pub fn parse_windows(spec: &str) -> Result<Vec<ForbiddenWindow>, ConfigError> {
    let mut windows = Vec::new();
    for part in spec.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (a, b) = part
            .split_once('-')
            .ok_or_else(|| ConfigError::InvalidWindow(part.to_string()))?;
        let start = NaiveTime::parse_from_str(a.trim(), "%H:%M")
            .map_err(|_| ConfigError::InvalidWindow(part.to_string()))?;
        let end = NaiveTime::parse_from_str(b.trim(), "%H:%M")
            .map_err(|_| ConfigError::InvalidWindow(part.to_string()))?;
        windows.push(ForbiddenWindow { start, end });
    }
    Ok(windows)
}
