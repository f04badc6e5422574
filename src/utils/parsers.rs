use crate::error::LaunchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 3600;
const SECS_PER_DAY: u64 = 86400;

/// Wall-clock limit of a job.
///
/// Parsed from the formats a Slurm-style scheduler accepts for `--time`:
///
/// - `"MM"`: minutes
/// - `"MM:SS"`: minutes:seconds
/// - `"HH:MM:SS"`: hours:minutes:seconds
/// - `"D-HH"`: days-hours
/// - `"D-HH:MM"`: days-hours:minutes
/// - `"D-HH:MM:SS"`: days-hours:minutes:seconds
///
/// Displayed as `D-HH:MM`, or `D-HH:MM:SS` when the seconds are not zero.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use glaunch::utils::parsers::TimeLimit;
///
/// let limit: TimeLimit = "0-03:00".parse().unwrap();
/// assert_eq!(limit.as_duration(), Duration::from_secs(3 * 3600));
/// assert_eq!(limit.to_string(), "0-03:00");
///
/// let limit: TimeLimit = "90".parse().unwrap();
/// assert_eq!(limit.to_string(), "0-01:30");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeLimit(Duration);

impl TimeLimit {
    /// Caller guarantees `secs > 0`.
    pub(crate) const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn from_duration(duration: Duration) -> Result<Self, LaunchError> {
        if duration.as_secs() == 0 {
            return Err(LaunchError::parse("time limit must be greater than zero"));
        }
        Ok(Self(Duration::from_secs(duration.as_secs())))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl FromStr for TimeLimit {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let secs = parse_time_limit_secs(s)?;
        Self::from_duration(Duration::from_secs(secs))
    }
}

impl TryFrom<String> for TimeLimit {
    type Error = LaunchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeLimit> for String {
    fn from(limit: TimeLimit) -> Self {
        limit.to_string()
    }
}

impl fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.as_secs();
        let days = total / SECS_PER_DAY;
        let hours = (total % SECS_PER_DAY) / SECS_PER_HOUR;
        let minutes = (total % SECS_PER_HOUR) / SECS_PER_MINUTE;
        let seconds = total % SECS_PER_MINUTE;

        if seconds == 0 {
            write!(f, "{days}-{hours:02}:{minutes:02}")
        } else {
            write!(f, "{days}-{hours:02}:{minutes:02}:{seconds:02}")
        }
    }
}

/// Parse a scheduler time string into a number of seconds.
///
/// # Examples
///
/// ```
/// use glaunch::utils::parsers::parse_time_limit_secs;
///
/// assert_eq!(parse_time_limit_secs("30").unwrap(), 1800);
/// assert_eq!(parse_time_limit_secs("30:45").unwrap(), 1845);
/// assert_eq!(parse_time_limit_secs("2:30:45").unwrap(), 9045);
/// assert_eq!(parse_time_limit_secs("1-12").unwrap(), 129600);
/// ```
pub fn parse_time_limit_secs(time_str: &str) -> Result<u64, LaunchError> {
    let time_str = time_str.trim();
    if time_str.is_empty() {
        return Err(LaunchError::parse("time limit cannot be empty"));
    }

    if let Some((days, rest)) = time_str.split_once('-') {
        let days = parse_field(days, "days", time_str)?;
        let parts: Vec<&str> = rest.split(':').collect();
        let (hours, minutes, seconds) = match parts.as_slice() {
            [h] => (parse_field(h, "hours", time_str)?, 0, 0),
            [h, m] => (
                parse_field(h, "hours", time_str)?,
                parse_field(m, "minutes", time_str)?,
                0,
            ),
            [h, m, s] => (
                parse_field(h, "hours", time_str)?,
                parse_field(m, "minutes", time_str)?,
                parse_field(s, "seconds", time_str)?,
            ),
            _ => return Err(invalid_format(time_str)),
        };
        return sum_secs(time_str, &[
            (days, SECS_PER_DAY),
            (hours, SECS_PER_HOUR),
            (minutes, SECS_PER_MINUTE),
            (seconds, 1),
        ]);
    }

    let parts: Vec<&str> = time_str.split(':').collect();
    match parts.as_slice() {
        [m] => {
            let minutes = parse_field(m, "minutes", time_str)?;
            sum_secs(time_str, &[(minutes, SECS_PER_MINUTE)])
        }
        [m, s] => {
            let minutes = parse_field(m, "minutes", time_str)?;
            let seconds = parse_field(s, "seconds", time_str)?;
            sum_secs(time_str, &[(minutes, SECS_PER_MINUTE), (seconds, 1)])
        }
        [h, m, s] => {
            let hours = parse_field(h, "hours", time_str)?;
            let minutes = parse_field(m, "minutes", time_str)?;
            let seconds = parse_field(s, "seconds", time_str)?;
            sum_secs(time_str, &[
                (hours, SECS_PER_HOUR),
                (minutes, SECS_PER_MINUTE),
                (seconds, 1),
            ])
        }
        _ => Err(invalid_format(time_str)),
    }
}

fn parse_field(field: &str, unit: &str, input: &str) -> Result<u64, LaunchError> {
    field
        .parse::<u64>()
        .map_err(|_| LaunchError::parse(format!("invalid {unit} in time limit '{input}'")))
}

fn sum_secs(input: &str, terms: &[(u64, u64)]) -> Result<u64, LaunchError> {
    terms.iter().try_fold(0u64, |acc, &(value, scale)| {
        value
            .checked_mul(scale)
            .and_then(|secs| acc.checked_add(secs))
            .ok_or_else(|| LaunchError::parse(format!("time limit '{input}' is too large")))
    })
}

fn invalid_format(input: &str) -> LaunchError {
    LaunchError::parse(format!(
        "invalid time limit '{input}'. Expected formats: MM, MM:SS, HH:MM:SS, D-HH, D-HH:MM or D-HH:MM:SS"
    ))
}
