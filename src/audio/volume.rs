//! Volume scaling.

/// Multiply every sample in place by `gain`.
///
/// `gain` is unconstrained; values above `1.0` may push samples past the
/// nominal range and rely on encode-time clamping.  A gain of exactly `1.0`
/// leaves the slice untouched.
pub fn scale_volume(samples: &mut [f64], gain: f64) {
    if gain == 1.0 {
        return;
    }
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

/// Convert a volume percentage (`100` = unity) into a linear gain.
pub fn gain_from_percent(percent: i32) -> f64 {
    f64::from(percent) / 100.0
}
