//! Pulse detection and heart-rate-variability metrics for BVP windows.
//!
//! The processing chain for one window is:
//!
//! 1. band-pass cleaning (3rd-order Butterworth, 0.5–8 Hz, zero phase)
//! 2. systolic peak detection after Elgendi et al. (2013): two moving
//!    averages over the squared, clipped signal mark "pulse waves" and each
//!    wave contributes its most prominent local maximum
//! 3. time-domain HRV from the inter-beat intervals
//! 4. LF/HF ratio from a Welch spectrum of the resampled interval series
//! 5. instantaneous heart rate interpolated over the window
//!
//! Every step returns [`HrvError`] instead of panicking; callers treat any
//! error as "this feature is unavailable for this window".

use rustfft::{num_complex::Complex64, FftPlanner};
use sci_rs::signal::filter::design::{
    butter_dyn, DigitalFilter, FilterBandType, FilterOutputType, Sos, SosFormatFilter,
};
use sci_rs::signal::filter::sosfiltfilt_dyn;
use statrs::statistics::Statistics;
use std::f64::consts::PI;

/// Band-pass edges for PPG cleaning (Hz).
const CLEAN_LOW_HZ: f64 = 0.5;
const CLEAN_HIGH_HZ: f64 = 8.0;
const CLEAN_ORDER: usize = 3;

/// Elgendi detector parameters.
const PEAK_WINDOW_SECS: f64 = 0.111;
const BEAT_WINDOW_SECS: f64 = 0.667;
const BEAT_OFFSET: f64 = 0.02;
const MIN_PEAK_DELAY_SECS: f64 = 0.3;

/// Resampling rate of the interval series for spectral analysis (Hz).
const RRI_RESAMPLE_HZ: f64 = 4.0;
const MIN_SPECTRUM_SAMPLES: usize = 16;
const LF_BAND: (f64, f64) = (0.04, 0.15);
const HF_BAND: (f64, f64) = (0.15, 0.40);

/// Why a metric could not be computed for a window.
#[derive(Debug, Clone, PartialEq)]
pub enum HrvError {
    /// Window contains NaN or infinite samples
    NonFiniteInput,
    /// Sampling rate too low for the cleaning filter
    SamplingRateTooLow(f64),
    /// Band-pass design did not produce second-order sections
    FilterDesign,
    /// Window shorter than the filter's edge padding
    TooShortToFilter { samples: usize, required: usize },
    /// No pulse wave rose above the detection threshold
    NoPulseWaves,
    /// Fewer peaks than the metric needs
    TooFewPeaks { found: usize, required: usize },
    /// Interval series too short for a spectrum
    SpectrumTooShort { samples: usize },
    /// High-frequency band carries no power
    NoHighFrequencyPower,
    /// A metric evaluated to NaN or infinity
    NonFinite(&'static str),
}

impl std::fmt::Display for HrvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HrvError::NonFiniteInput => write!(f, "window contains non-finite samples"),
            HrvError::SamplingRateTooLow(rate) => {
                write!(f, "sampling rate {rate} Hz is too low for PPG cleaning")
            }
            HrvError::FilterDesign => write!(f, "band-pass design yielded no SOS filter"),
            HrvError::TooShortToFilter { samples, required } => {
                write!(f, "window of {samples} samples is too short to filter, need {required}")
            }
            HrvError::NoPulseWaves => write!(f, "no pulse waves detected"),
            HrvError::TooFewPeaks { found, required } => {
                write!(f, "found {found} peaks, need at least {required}")
            }
            HrvError::SpectrumTooShort { samples } => {
                write!(f, "interval series of {samples} samples is too short for a spectrum")
            }
            HrvError::NoHighFrequencyPower => write!(f, "no power in the HF band"),
            HrvError::NonFinite(metric) => write!(f, "{metric} is not finite"),
        }
    }
}

impl std::error::Error for HrvError {}

/// Time-domain HRV over one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeDomain {
    /// Mean inter-beat interval in milliseconds
    pub mean_nn_ms: f64,
    /// Root mean square of successive interval differences (ms)
    pub rmssd_ms: f64,
}

impl TimeDomain {
    /// Mean heart rate in beats per minute, if the mean interval is positive.
    pub fn mean_hr_bpm(&self) -> Option<f64> {
        (self.mean_nn_ms > 0.0).then(|| 60_000.0 / self.mean_nn_ms)
    }
}

/// Band-pass a raw BVP window.
pub fn clean_ppg(signal: &[f64], sampling_rate: f64) -> Result<Vec<f64>, HrvError> {
    if signal.iter().any(|v| !v.is_finite()) {
        return Err(HrvError::NonFiniteInput);
    }
    if !sampling_rate.is_finite() || sampling_rate <= 2.0 * CLEAN_HIGH_HZ {
        return Err(HrvError::SamplingRateTooLow(sampling_rate));
    }

    let sos = band_pass_sos(sampling_rate)?;
    // Odd extension on both edges needs more samples than its pad length
    let required = 3 * (2 * sos.len() + 1) + 1;
    if signal.len() < required {
        return Err(HrvError::TooShortToFilter {
            samples: signal.len(),
            required,
        });
    }
    Ok(sosfiltfilt_dyn(signal.iter(), &sos))
}

/// Butterworth band-pass for PPG cleaning in second-order sections.
fn band_pass_sos(sampling_rate: f64) -> Result<Vec<Sos<f64>>, HrvError> {
    let filter = butter_dyn(
        CLEAN_ORDER,
        vec![CLEAN_LOW_HZ, CLEAN_HIGH_HZ],
        Some(FilterBandType::Bandpass),
        Some(false),
        Some(FilterOutputType::Sos),
        Some(sampling_rate),
    );
    match filter {
        DigitalFilter::Sos(SosFormatFilter { sos }) => Ok(sos),
        _ => Err(HrvError::FilterDesign),
    }
}

/// Detect systolic peaks in a cleaned PPG signal.
///
/// Returns sample indices in increasing order.
pub fn find_pulse_peaks(cleaned: &[f64], sampling_rate: f64) -> Result<Vec<usize>, HrvError> {
    let n = cleaned.len();
    if n < 2 {
        return Err(HrvError::NoPulseWaves);
    }

    let squared: Vec<f64> = cleaned.iter().map(|&v| v.max(0.0).powi(2)).collect();

    let peak_kernel = seconds_to_samples(PEAK_WINDOW_SECS, sampling_rate);
    let beat_kernel = seconds_to_samples(BEAT_WINDOW_SECS, sampling_rate);
    let ma_peak = boxcar_smooth(&squared, peak_kernel);
    let ma_beat = boxcar_smooth(&squared, beat_kernel);

    let threshold_offset = BEAT_OFFSET * squared.iter().sum::<f64>() / n as f64;
    let waves: Vec<bool> = ma_peak
        .iter()
        .zip(&ma_beat)
        .map(|(&p, &b)| p > b + threshold_offset)
        .collect();

    let begins: Vec<usize> = (0..n - 1).filter(|&i| !waves[i] && waves[i + 1]).collect();
    let first_begin = *begins.first().ok_or(HrvError::NoPulseWaves)?;
    let ends: Vec<usize> = (0..n - 1)
        .filter(|&i| waves[i] && !waves[i + 1] && i > first_begin)
        .collect();

    let min_len = peak_kernel;
    let min_delay = seconds_to_samples(MIN_PEAK_DELAY_SECS, sampling_rate);

    // Peaks closer than `min_delay` to the window start are rejected as well
    let mut last_peak = 0usize;
    let mut peaks = Vec::new();
    for (&begin, &end) in begins.iter().zip(&ends) {
        if end < begin || end - begin < min_len {
            continue;
        }
        let Some(offset) = most_prominent_peak(&cleaned[begin..end]) else {
            continue;
        };
        let peak = begin + offset;
        if peak > last_peak && peak - last_peak > min_delay {
            peaks.push(peak);
            last_peak = peak;
        }
    }

    Ok(peaks)
}

/// Mean interval and RMSSD from peak positions.
pub fn time_domain(peaks: &[usize], sampling_rate: f64) -> Result<TimeDomain, HrvError> {
    let intervals = intervals_ms(peaks, sampling_rate);
    if intervals.len() < 2 {
        return Err(HrvError::TooFewPeaks {
            found: peaks.len(),
            required: 3,
        });
    }

    let mean_nn_ms = Statistics::mean(&intervals);
    let successive: Vec<f64> = intervals
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).powi(2))
        .collect();
    let rmssd_ms = Statistics::mean(&successive).sqrt();

    if !mean_nn_ms.is_finite() {
        return Err(HrvError::NonFinite("mean NN"));
    }
    if !rmssd_ms.is_finite() {
        return Err(HrvError::NonFinite("RMSSD"));
    }

    Ok(TimeDomain {
        mean_nn_ms,
        rmssd_ms,
    })
}

/// Ratio of low- to high-frequency power of the inter-beat interval series.
pub fn lf_hf_ratio(peaks: &[usize], sampling_rate: f64) -> Result<f64, HrvError> {
    let intervals = intervals_ms(peaks, sampling_rate);
    if intervals.len() < 2 {
        return Err(HrvError::TooFewPeaks {
            found: peaks.len(),
            required: 3,
        });
    }

    // Each interval is placed at the time of the beat that closes it
    let times: Vec<f64> = peaks[1..]
        .iter()
        .map(|&p| p as f64 / sampling_rate)
        .collect();
    let t0 = times[0];
    let span = times[times.len() - 1] - t0;
    let samples = (span * RRI_RESAMPLE_HZ) as usize + 1;
    if samples < MIN_SPECTRUM_SAMPLES {
        return Err(HrvError::SpectrumTooShort { samples });
    }

    let grid = (0..samples).map(|i| t0 + i as f64 / RRI_RESAMPLE_HZ);
    let mut resampled = interpolate_linear(&times, &intervals, grid);
    let mean = Statistics::mean(&resampled);
    resampled.iter_mut().for_each(|v| *v -= mean);

    // Two cycles of the lowest LF frequency, bounded by half the series
    let preferred = (2.0 / LF_BAND.0 * RRI_RESAMPLE_HZ) as usize;
    let segment = preferred.min(samples / 2);
    if segment < MIN_SPECTRUM_SAMPLES / 2 {
        return Err(HrvError::SpectrumTooShort { samples });
    }

    let (freqs, psd) = welch_psd(&resampled, RRI_RESAMPLE_HZ, segment);
    let lf = band_power(&freqs, &psd, LF_BAND);
    let hf = band_power(&freqs, &psd, HF_BAND);

    if hf.is_nan() || hf <= 0.0 {
        return Err(HrvError::NoHighFrequencyPower);
    }
    let ratio = lf / hf;
    if !ratio.is_finite() {
        return Err(HrvError::NonFinite("LF/HF"));
    }
    Ok(ratio)
}

/// Instantaneous heart rate (bpm) at every sample of a window of `len` samples.
pub fn instantaneous_rate(
    peaks: &[usize],
    sampling_rate: f64,
    len: usize,
) -> Result<Vec<f64>, HrvError> {
    if peaks.len() < 3 {
        return Err(HrvError::TooFewPeaks {
            found: peaks.len(),
            required: 3,
        });
    }

    let mut periods: Vec<f64> = std::iter::once(0.0)
        .chain(
            peaks
                .windows(2)
                .map(|pair| (pair[1] - pair[0]) as f64 / sampling_rate),
        )
        .collect();
    // The first beat has no predecessor; use the mean of the others
    periods[0] = Statistics::mean(&periods[1..]);

    let rates: Vec<f64> = periods.iter().map(|p| 60.0 / p).collect();
    let knots: Vec<f64> = peaks.iter().map(|&p| p as f64).collect();

    let rate = interpolate_linear(&knots, &rates, (0..len).map(|i| i as f64));
    if rate.iter().any(|v| !v.is_finite()) {
        return Err(HrvError::NonFinite("heart rate"));
    }
    Ok(rate)
}

fn intervals_ms(peaks: &[usize], sampling_rate: f64) -> Vec<f64> {
    peaks
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f64 / sampling_rate * 1000.0)
        .collect()
}

fn seconds_to_samples(secs: f64, sampling_rate: f64) -> usize {
    ((secs * sampling_rate).round() as usize).max(1)
}

/// Centered moving average with edge-value padding.
///
/// For an even kernel the window extends one sample further to the left.
fn boxcar_smooth(signal: &[f64], kernel: usize) -> Vec<f64> {
    let n = signal.len();
    let left = kernel / 2;
    let right = (kernel - 1) / 2;
    let at = |i: isize| -> f64 { signal[i.clamp(0, n as isize - 1) as usize] };

    (0..n as isize)
        .map(|i| {
            let sum: f64 = (i - left as isize..=i + right as isize).map(&at).sum();
            sum / kernel as f64
        })
        .collect()
}

/// Offset of the local maximum with the largest prominence, if any.
fn most_prominent_peak(data: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for peak in local_maxima(data) {
        let prominence = prominence(data, peak);
        if best.map_or(true, |(_, p)| prominence > p) {
            best = Some((peak, prominence));
        }
    }
    best.map(|(peak, _)| peak)
}

/// Strict local maxima; a flat top reports its middle sample.
fn local_maxima(data: &[f64]) -> Vec<usize> {
    let n = data.len();
    let mut maxima = Vec::new();
    let mut i = 1;
    while i + 1 < n {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead + 1 < n && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Height of a peak above the higher of its two surrounding minima.
fn prominence(data: &[f64], peak: usize) -> f64 {
    let height = data[peak];

    let mut left_min = height;
    for &v in data[..=peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &data[peak..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

/// Piecewise-linear interpolation through `(xs, ys)`, constant outside.
///
/// `xs` must be non-empty and increasing; `at` must be non-decreasing.
fn interpolate_linear(xs: &[f64], ys: &[f64], at: impl Iterator<Item = f64>) -> Vec<f64> {
    let last = xs.len() - 1;
    let mut k = 0;
    at.map(|x| {
        if x <= xs[0] {
            return ys[0];
        }
        if x >= xs[last] {
            return ys[last];
        }
        while xs[k + 1] < x {
            k += 1;
        }
        let t = (x - xs[k]) / (xs[k + 1] - xs[k]);
        ys[k] + t * (ys[k + 1] - ys[k])
    })
    .collect()
}

/// One-sided Welch power spectral density with a periodic Hann window and
/// 50% overlap. Each segment has its mean removed.
fn welch_psd(signal: &[f64], fs: f64, segment: usize) -> (Vec<f64>, Vec<f64>) {
    let window: Vec<f64> = (0..segment)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / segment as f64).cos())
        .collect();
    let scale = 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>());
    let step = segment - segment / 2;
    let bins = segment / 2 + 1;

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(segment);

    let mut psd = vec![0.0; bins];
    let mut count = 0usize;
    let mut start = 0;
    while start + segment <= signal.len() {
        let chunk = &signal[start..start + segment];
        let mean = chunk.iter().sum::<f64>() / segment as f64;
        let mut buffer: Vec<Complex64> = chunk
            .iter()
            .zip(&window)
            .map(|(&x, &w)| Complex64::new((x - mean) * w, 0.0))
            .collect();
        fft.process(&mut buffer);

        for (k, value) in psd.iter_mut().enumerate() {
            let nyquist = segment % 2 == 0 && k == segment / 2;
            let one_sided = if k == 0 || nyquist { 1.0 } else { 2.0 };
            *value += buffer[k].norm_sqr() * scale * one_sided;
        }
        count += 1;
        start += step;
    }

    if count > 0 {
        psd.iter_mut().for_each(|v| *v /= count as f64);
    }
    let freqs = (0..bins).map(|k| k as f64 * fs / segment as f64).collect();
    (freqs, psd)
}

/// Trapezoidal power over `[low, high)`.
fn band_power(freqs: &[f64], psd: &[f64], (low, high): (f64, f64)) -> f64 {
    let in_band: Vec<(f64, f64)> = freqs
        .iter()
        .zip(psd)
        .filter(|(&f, _)| f >= low && f < high)
        .map(|(&f, &p)| (f, p))
        .collect();

    in_band
        .windows(2)
        .map(|pair| (pair[1].0 - pair[0].0) * (pair[0].1 + pair[1].1) / 2.0)
        .sum()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Synthetic pulse signal whose beat-to-beat interval follows `rr(t)`.
    pub(crate) fn synthetic_ppg(
        sampling_rate: f64,
        secs: f64,
        rr: impl Fn(f64) -> f64,
    ) -> Vec<f64> {
        let n = (secs * sampling_rate) as usize;
        let mut phase = 0.0;
        (0..n)
            .map(|i| {
                let t = i as f64 / sampling_rate;
                phase += 2.0 * PI / (rr(t) * sampling_rate);
                phase.sin() + 0.3 * (2.0 * phase).sin()
            })
            .collect()
    }

    fn peaks_of(signal: &[f64], fs: f64) -> Vec<usize> {
        let cleaned = clean_ppg(signal, fs).unwrap();
        find_pulse_peaks(&cleaned, fs).unwrap()
    }

    #[test]
    fn test_detects_steady_pulse() {
        let signal = synthetic_ppg(64.0, 60.0, |_| 0.8);
        let peaks = peaks_of(&signal, 64.0);

        assert!(
            (70..=76).contains(&peaks.len()),
            "found {} peaks",
            peaks.len()
        );
        assert!(peaks.windows(2).all(|p| p[1] > p[0]));

        let td = time_domain(&peaks, 64.0).unwrap();
        let hr = td.mean_hr_bpm().unwrap();
        assert!((hr - 75.0).abs() < 1.5, "hr = {hr}");
        assert!(td.rmssd_ms.is_finite() && td.rmssd_ms < 40.0);
    }

    #[test]
    fn test_flat_signal_has_no_pulse() {
        let cleaned = clean_ppg(&[0.0; 3840], 64.0).unwrap();
        assert_eq!(
            find_pulse_peaks(&cleaned, 64.0),
            Err(HrvError::NoPulseWaves)
        );
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let mut signal = vec![0.0; 100];
        signal[50] = f64::NAN;
        assert_eq!(clean_ppg(&signal, 64.0), Err(HrvError::NonFiniteInput));
    }

    fn rms(values: &[f64]) -> f64 {
        (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
    }

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_band_pass_gain() {
        let n = 64 * 60;
        let core = n / 4..3 * n / 4;

        // Pulse band passes nearly untouched
        let input = sine(1.5, 64.0, n);
        let output = clean_ppg(&input, 64.0).unwrap();
        let gain = rms(&output[core.clone()]) / rms(&input[core.clone()]);
        assert!((gain - 1.0).abs() < 0.05, "passband gain = {gain}");

        // Twice the upper edge is attenuated by the squared 3rd-order response
        let input = sine(16.0, 64.0, n);
        let output = clean_ppg(&input, 64.0).unwrap();
        let gain = rms(&output[core.clone()]) / rms(&input[core]);
        assert!(gain < 0.01, "stopband gain = {gain}");
    }

    #[test]
    fn test_band_pass_removes_baseline() {
        let input: Vec<f64> = sine(1.2, 64.0, 3840).iter().map(|v| v + 50.0).collect();
        let output = clean_ppg(&input, 64.0).unwrap();
        let mean = output[960..2880].iter().sum::<f64>() / 1920.0;
        assert!(mean.abs() < 0.05, "mean = {mean}");
    }

    #[test]
    fn test_short_window_not_filtered() {
        assert!(matches!(
            clean_ppg(&[0.0; 10], 64.0),
            Err(HrvError::TooShortToFilter { samples: 10, .. })
        ));
    }

    #[test]
    fn test_low_sampling_rate_rejected() {
        assert!(matches!(
            clean_ppg(&[0.0; 100], 4.0),
            Err(HrvError::SamplingRateTooLow(_))
        ));
    }

    #[test]
    fn test_lf_hf_follows_modulation() {
        // Slow (0.1 Hz) interval modulation puts power in LF
        let slow = synthetic_ppg(64.0, 60.0, |t| 0.8 + 0.08 * (2.0 * PI * 0.1 * t).sin());
        let lf_dominant = lf_hf_ratio(&peaks_of(&slow, 64.0), 64.0).unwrap();
        assert!(lf_dominant > 1.0, "ratio = {lf_dominant}");

        // Respiratory-rate (0.25 Hz) modulation puts power in HF
        let fast = synthetic_ppg(64.0, 60.0, |t| 0.8 + 0.08 * (2.0 * PI * 0.25 * t).sin());
        let hf_dominant = lf_hf_ratio(&peaks_of(&fast, 64.0), 64.0).unwrap();
        assert!(hf_dominant < 1.0, "ratio = {hf_dominant}");
    }

    #[test]
    fn test_instantaneous_rate() {
        let peaks = [0, 64, 128, 192, 256];
        let rate = instantaneous_rate(&peaks, 64.0, 300).unwrap();
        assert_eq!(rate.len(), 300);
        assert!(rate.iter().all(|&r| (r - 60.0).abs() < 1e-9));
    }

    #[test]
    fn test_too_few_peaks() {
        assert!(matches!(
            time_domain(&[10, 70], 64.0),
            Err(HrvError::TooFewPeaks { .. })
        ));
        assert!(instantaneous_rate(&[10, 70], 64.0, 100).is_err());
        assert!(lf_hf_ratio(&[], 64.0).is_err());
    }

    #[test]
    fn test_short_interval_series_has_no_spectrum() {
        let peaks: Vec<usize> = (0..6).map(|i| 20 + i * 51).collect();
        assert!(matches!(
            lf_hf_ratio(&peaks, 64.0),
            Err(HrvError::SpectrumTooShort { .. })
        ));
    }

    #[test]
    fn test_prominence_picks_tallest_bump() {
        let data = [0.0, 1.0, 0.5, 3.0, 0.2, 0.8, 0.0];
        assert_eq!(local_maxima(&data), vec![1, 3, 5]);
        assert_eq!(most_prominent_peak(&data), Some(3));
        assert!((prominence(&data, 1) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_flat_top_reports_middle() {
        let data = [0.0, 2.0, 2.0, 2.0, 0.0];
        assert_eq!(local_maxima(&data), vec![2]);
    }

    #[test]
    fn test_boxcar_edges() {
        let smoothed = boxcar_smooth(&[1.0, 1.0, 4.0, 1.0, 1.0], 3);
        assert_eq!(smoothed, vec![1.0, 2.0, 2.0, 2.0, 1.0]);
    }
}
