//
// Copyright 2024 The Timesignature Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! ASN.1 time values as 64-bit epoch seconds.
//!
//! Strict DER normalizes `UTCTime` and `GeneralizedTime` to UTC before
//! they reach this layer, so the conversions here only have to range
//! check the result.

use chrono::{DateTime, Utc};
use der::asn1::GeneralizedTime;
use x509_cert::time::Time;

use crate::errors::{Result, TimeSignatureError};

pub(crate) fn generalized_time_to_unix(time: &GeneralizedTime) -> Result<i64> {
    i64::try_from(time.to_unix_duration().as_secs()).map_err(|_| TimeSignatureError::TimeOverflow)
}

pub(crate) fn x509_time_to_unix(time: &Time) -> Result<i64> {
    let duration = match time {
        Time::UtcTime(t) => t.to_unix_duration(),
        Time::GeneralTime(t) => t.to_unix_duration(),
    };
    i64::try_from(duration.as_secs()).map_err(|_| TimeSignatureError::TimeOverflow)
}

/// Renders epoch seconds for human consumption.
pub(crate) fn format_unix(seconds: i64) -> String {
    match DateTime::<Utc>::from_timestamp(seconds, 0) {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "(out of range)".to_string(),
    }
}
