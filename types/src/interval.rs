use std::str::FromStr;

use regex::Regex;
use serde::{de::Visitor, Deserialize, Serialize};

use crate::Error;

/// Candle granularities the market-data provider serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
    OneDay,
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
        };
        return write!(f, "{value}");
    }
}

impl Interval {
    pub fn is_intraday(&self) -> bool {
        return *self != Interval::OneDay;
    }
}

impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let regex = Regex::new(r"^(\d+)([mhd])$")
            .map_err(|err| Error::IntervalError(err.to_string()))?;
        let captures = regex
            .captures(s.trim())
            .ok_or_else(|| Error::IntervalError(format!("invalid format '{s}'")))?;
        let value = captures[1]
            .parse::<u32>()
            .map_err(|err| Error::IntervalError(err.to_string()))?;

        return match (value, &captures[2]) {
            (1, "m") => Ok(Interval::OneMinute),
            (5, "m") => Ok(Interval::FiveMinutes),
            (15, "m") => Ok(Interval::FifteenMinutes),
            (1, "h") | (60, "m") => Ok(Interval::OneHour),
            (1, "d") | (24, "h") => Ok(Interval::OneDay),
            _ => Err(Error::IntervalError(format!("unsupported interval '{s}'"))),
        };
    }
}

struct IntervalVisitor;

impl<'de> Visitor<'de> for IntervalVisitor {
    type Value = Interval;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        return formatter.write_str("one of '1m', '5m', '15m', '1h' or '1d'");
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        return Interval::from_str(v).map_err(E::custom);
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        return deserializer.deserialize_str(IntervalVisitor);
    }
}

impl Serialize for Interval {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        return serializer.collect_str(self);
    }
}
