//! Reduces one session's readings to a summary row.

use chrono::NaiveDateTime;
use session_core::error::{Result, SessionError};
use session_core::formatting::round2;
use session_core::models::{Session, SignalRecord};

/// Stateless helper that summarises a session segment.
pub struct SessionAggregator;

impl SessionAggregator {
    /// Summarise `segment`, the time-ordered readings of device `mac`.
    ///
    /// Means and the duration are rounded to two decimals. The serial number
    /// and start time come from the first reading. A single-reading segment
    /// has a duration of exactly `0.0`.
    pub fn summarize(mac: &str, segment: &[SignalRecord]) -> Result<Session> {
        let (Some(first), Some(last)) = (segment.first(), segment.last()) else {
            return Err(SessionError::Aggregation {
                mac: mac.to_string(),
                metric: "readings".to_string(),
            });
        };

        let avg_signal = Self::mean(mac, "signal", segment.iter().map(|r| r.signal))?;
        let avg_tx_rate = Self::mean(mac, "tx_rate", segment.iter().map(|r| r.tx_rate))?;
        let avg_rx_rate = Self::mean(mac, "rx_rate", segment.iter().map(|r| r.rx_rate))?;
        let duration_secs = Self::span_seconds(first.timestamp, last.timestamp);

        Ok(Session {
            serial_no: first.serial_no.clone(),
            mac: mac.to_string(),
            avg_signal: round2(avg_signal),
            avg_tx_rate: round2(avg_tx_rate),
            avg_rx_rate: round2(avg_rx_rate),
            duration_hours: round2(duration_secs / 3600.0),
            start_time: first.timestamp,
        })
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Arithmetic mean of the present values, accumulated in input order.
    fn mean(mac: &str, metric: &str, values: impl Iterator<Item = Option<f64>>) -> Result<f64> {
        let (sum, count) = values
            .flatten()
            .fold((0.0_f64, 0usize), |(sum, count), v| (sum + v, count + 1));

        let mean = sum / count as f64;
        if count == 0 || !mean.is_finite() {
            return Err(SessionError::Aggregation {
                mac: mac.to_string(),
                metric: metric.to_string(),
            });
        }
        Ok(mean)
    }

    /// Seconds between `first` and `last`, with microsecond precision.
    fn span_seconds(first: NaiveDateTime, last: NaiveDateTime) -> f64 {
        let delta = last - first;
        match delta.num_microseconds() {
            Some(us) => us as f64 / 1_000_000.0,
            None => delta.num_seconds() as f64,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
