//! Sliding-window index generation over fixed-rate sample arrays.
//!
//! Windows are expressed in samples. Durations given in seconds are
//! converted by multiplying with the sampling rate and truncating, so a
//! 0.25 s shift at 4 Hz is one sample and at 32 Hz is eight.

use serde::{Deserialize, Serialize};

/// A contiguous slice `[start, end)` of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// First sample index (inclusive)
    pub start: usize,
    /// One past the last sample index
    pub end: usize,
}

impl Window {
    /// Number of samples covered by this window.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Windows produced by [`WindowParams`] are never empty.
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Timestamp in seconds assigned to this window: its end position.
    pub fn timestamp(&self, sampling_rate: f64) -> f64 {
        self.end as f64 / sampling_rate
    }

    /// Borrow the samples of this window from a signal.
    pub fn slice<'a, T>(&self, signal: &'a [T]) -> &'a [T] {
        &signal[self.start..self.end]
    }
}

/// Window length and stride, both in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParams {
    pub size: usize,
    pub shift: usize,
}

impl WindowParams {
    /// Build window parameters directly from sample counts.
    pub fn new(size: usize, shift: usize) -> Result<Self, WindowError> {
        if size == 0 {
            return Err(WindowError::EmptyWindow);
        }
        if shift == 0 {
            return Err(WindowError::ZeroShift);
        }
        Ok(Self { size, shift })
    }

    /// Convert a window duration and shift in seconds to sample counts.
    pub fn from_seconds(
        sampling_rate: f64,
        window_secs: f64,
        shift_secs: f64,
    ) -> Result<Self, WindowError> {
        if !sampling_rate.is_finite() || sampling_rate <= 0.0 {
            return Err(WindowError::InvalidSamplingRate(sampling_rate));
        }
        if !window_secs.is_finite() || window_secs <= 0.0 {
            return Err(WindowError::InvalidDuration(window_secs));
        }
        if !shift_secs.is_finite() || shift_secs <= 0.0 {
            return Err(WindowError::InvalidDuration(shift_secs));
        }

        // Truncation toward zero, matching integer conversion of the product
        let size = (window_secs * sampling_rate) as usize;
        let shift = (shift_secs * sampling_rate) as usize;
        Self::new(size, shift)
    }

    /// Iterate over every full window that fits in a signal of `len` samples.
    ///
    /// A trailing partial window is never produced; a signal shorter than one
    /// window yields nothing.
    pub fn windows(&self, len: usize) -> Windows {
        Windows {
            next_start: 0,
            size: self.size,
            shift: self.shift,
            len,
        }
    }

    /// Number of windows [`WindowParams::windows`] yields for `len` samples.
    pub fn window_count(&self, len: usize) -> usize {
        if len < self.size {
            0
        } else {
            (len - self.size) / self.shift + 1
        }
    }
}

/// Iterator over the windows of a signal.
#[derive(Debug, Clone)]
pub struct Windows {
    next_start: usize,
    size: usize,
    shift: usize,
    len: usize,
}

impl Iterator for Windows {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        let end = self.next_start.checked_add(self.size)?;
        if end > self.len {
            return None;
        }
        let window = Window {
            start: self.next_start,
            end,
        };
        self.next_start = self.next_start.saturating_add(self.shift);
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next_start.checked_add(self.size) {
            Some(end) if end <= self.len => (self.len - end) / self.shift + 1,
            _ => 0,
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Windows {}

/// Invalid windowing parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowError {
    InvalidSamplingRate(f64),
    InvalidDuration(f64),
    EmptyWindow,
    ZeroShift,
}

impl std::fmt::Display for WindowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowError::InvalidSamplingRate(r) => write!(f, "invalid sampling rate: {r} Hz"),
            WindowError::InvalidDuration(d) => write!(f, "invalid duration: {d} s"),
            WindowError::EmptyWindow => write!(f, "window length truncates to zero samples"),
            WindowError::ZeroShift => write!(f, "window shift truncates to zero samples"),
        }
    }
}

impl std::error::Error for WindowError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_seconds_truncates() {
        let params = WindowParams::from_seconds(32.0, 5.0, 0.25).unwrap();
        assert_eq!(params.size, 160);
        assert_eq!(params.shift, 8);

        let params = WindowParams::from_seconds(4.0, 60.0, 0.25).unwrap();
        assert_eq!(params.size, 240);
        assert_eq!(params.shift, 1);

        // 0.3 * 4 = 1.2 -> 1 sample
        let params = WindowParams::from_seconds(4.0, 1.0, 0.3).unwrap();
        assert_eq!(params.shift, 1);
    }

    #[test]
    fn test_zero_sample_shift_rejected() {
        assert_eq!(
            WindowParams::from_seconds(4.0, 60.0, 0.1),
            Err(WindowError::ZeroShift)
        );
        assert_eq!(
            WindowParams::from_seconds(4.0, 0.1, 1.0),
            Err(WindowError::EmptyWindow)
        );
        assert!(WindowParams::from_seconds(0.0, 1.0, 1.0).is_err());
        assert!(WindowParams::from_seconds(4.0, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_window_count_formula() {
        let params = WindowParams::new(160, 8).unwrap();
        for len in [0, 1, 159, 160, 161, 167, 168, 320, 1000] {
            let expected = if len >= 160 { (len - 160) / 8 + 1 } else { 0 };
            assert_eq!(params.windows(len).count(), expected, "len = {len}");
            assert_eq!(params.window_count(len), expected);
            assert_eq!(params.windows(len).len(), expected);
        }
    }

    #[test]
    fn test_last_window_fits_exactly() {
        let params = WindowParams::new(4, 2).unwrap();
        let windows: Vec<Window> = params.windows(8).collect();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], Window { start: 0, end: 4 });
        assert_eq!(windows[2], Window { start: 4, end: 8 });
        assert!(windows.iter().all(|w| w.len() == 4));
    }

    #[test]
    fn test_short_signal_has_no_windows() {
        let params = WindowParams::new(10, 1).unwrap();
        assert_eq!(params.windows(9).next(), None);
    }

    #[test]
    fn test_window_timestamp() {
        let window = Window { start: 8, end: 168 };
        assert_eq!(window.timestamp(32.0), 5.25);
    }
}
