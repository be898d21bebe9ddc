//! Fixed-length key-rotation windows.
//!
//! All arithmetic is in integer milliseconds since the Unix epoch, so
//! `end_ms - start_ms` is exactly the configured length for every window.

use crate::core::constants::MS_PER_HOUR;
use crate::error::{Result, SessionSdkError};
use crate::types::WindowBoundaries;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowScheduler {
    length_ms: u64,
}

impl WindowScheduler {
    pub fn from_millis(length_ms: u64) -> Result<Self> {
        if length_ms == 0 {
            return Err(SessionSdkError::InvalidWindow(
                "window length must be at least 1ms".to_string(),
            ));
        }
        Ok(Self { length_ms })
    }

    /// Window length in (possibly fractional) hours, rounded once to whole milliseconds.
    pub fn from_hours(hours: f64) -> Result<Self> {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(SessionSdkError::InvalidWindow(format!(
                "window hours must be positive, got {}",
                hours
            )));
        }
        let ms = (hours * MS_PER_HOUR as f64).round();
        if ms < 1.0 || ms >= u64::MAX as f64 {
            return Err(SessionSdkError::InvalidWindow(format!(
                "window of {} hours is not representable in milliseconds",
                hours
            )));
        }
        Self::from_millis(ms as u64)
    }

    pub fn from_duration(length: Duration) -> Result<Self> {
        let ms = u64::try_from(length.as_millis()).map_err(|_| {
            SessionSdkError::InvalidWindow("window length overflows u64 milliseconds".to_string())
        })?;
        Self::from_millis(ms)
    }

    pub fn length_ms(&self) -> u64 {
        self.length_ms
    }

    /// Boundaries of the window containing `now_ms`.
    pub fn boundaries_at(&self, now_ms: u64) -> WindowBoundaries {
        let window_number = now_ms / self.length_ms;
        let start_ms = window_number * self.length_ms;
        WindowBoundaries {
            window_number,
            start_ms,
            // now_ms < start_ms + length_ms <= now_ms + length_ms; saturate at the top of time
            end_ms: start_ms.saturating_add(self.length_ms),
        }
    }

    /// Boundaries of an explicitly numbered window.
    pub fn boundaries_for(&self, window_number: u64) -> Result<WindowBoundaries> {
        let start_ms = window_number
            .checked_mul(self.length_ms)
            .ok_or_else(|| {
                SessionSdkError::InvalidWindow(format!("window {} is out of range", window_number))
            })?;
        let end_ms = start_ms.checked_add(self.length_ms).ok_or_else(|| {
            SessionSdkError::InvalidWindow(format!("window {} is out of range", window_number))
        })?;
        Ok(WindowBoundaries {
            window_number,
            start_ms,
            end_ms,
        })
    }

    /// Boundaries of `explicit_window` if given, otherwise of the current window.
    pub fn boundaries(&self, explicit_window: Option<u64>) -> Result<WindowBoundaries> {
        match explicit_window {
            Some(n) => self.boundaries_for(n),
            None => Ok(self.boundaries_at(now_ms())),
        }
    }
}

/// Convenience wrapper taking the window length in hours.
pub fn boundaries(window_hours: f64, explicit_window: Option<u64>) -> Result<WindowBoundaries> {
    WindowScheduler::from_hours(window_hours)?.boundaries(explicit_window)
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
