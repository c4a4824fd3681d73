use std::time::Duration;

/// Clamps a playhead position in seconds to `[0, duration]`.
///
/// Infinite input lands on the nearer bound, NaN collapses to `0`, and a
/// non-positive duration pins the playhead at `0`.
///
/// # Example
/// ```
/// use timeline_engine::time::clamp_time;
///
/// assert_eq!(clamp_time(-5.0, 10.0), 0.0);
/// assert_eq!(clamp_time(15.0, 10.0), 10.0);
/// assert_eq!(clamp_time(4.5, 10.0), 4.5);
/// ```
pub fn clamp_time(t: f64, duration: f64) -> f64 {
    if t.is_nan() || duration.is_nan() || duration <= 0.0 {
        return 0.0;
    }
    t.clamp(0.0, duration)
}

/// Clamps a volume level to the `0..=100` range used by playable handles.
pub fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 100.0)
}

/// Converts an elapsed wall-clock delta into timeline seconds at `rate`.
pub fn elapsed_seconds(delta: Duration, rate: f64) -> f64 {
    let seconds = delta.as_secs_f64() * rate;
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

/// Converts a millisecond setting into a `Duration`.
pub fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{clamp_time, clamp_volume, elapsed_seconds};

    #[test]
    fn clamp_time_handles_empty_and_non_finite_input() {
        assert_eq!(clamp_time(3.0, 0.0), 0.0);
        assert_eq!(clamp_time(f64::NAN, 10.0), 0.0);
        assert_eq!(clamp_time(f64::INFINITY, 10.0), 10.0);
        assert_eq!(clamp_time(f64::NEG_INFINITY, 10.0), 0.0);
        assert_eq!(clamp_time(10.0, 10.0), 10.0);
    }

    #[test]
    fn clamp_volume_pins_to_percent_range() {
        assert_eq!(clamp_volume(150.0), 100.0);
        assert_eq!(clamp_volume(-10.0), 0.0);
        assert_eq!(clamp_volume(f64::NAN), 0.0);
        assert_eq!(clamp_volume(42.0), 42.0);
    }

    #[test]
    fn elapsed_seconds_scales_by_rate() {
        let seconds = elapsed_seconds(Duration::from_millis(500), 2.0);
        assert!((seconds - 1.0).abs() < 1e-9);
        assert_eq!(elapsed_seconds(Duration::from_millis(500), -1.0), 0.0);
    }
}
