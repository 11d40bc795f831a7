//! PCM helpers for synthesized audio.

/// Decode little-endian signed 16-bit PCM. A trailing odd byte is ignored.
pub fn samples_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Peak-normalize samples towards `target`, never amplifying beyond `max_gain`.
///
/// Loud input is attenuated down to `target`; silent input is left untouched.
pub fn normalize(samples: &[i16], target: i16, max_gain: f32) -> Vec<i16> {
    let peak = samples
        .iter()
        .map(|&s| i32::from(s).abs())
        .max()
        .filter(|&p| p > 0)
        .unwrap_or(1);

    let gain = (f32::from(target) / peak as f32).min(max_gain);
    samples
        .iter()
        .map(|&s| (f32::from(s) * gain).clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16)
        .collect()
}

/// Convert i16 samples to f32 in [-1.0, 1.0].
pub fn to_f32(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&s| f32::from(s) / f32::from(i16::MAX))
        .collect()
}

/// Playback duration of `sample_count` mono samples at `sample_rate`.
pub fn duration_of(sample_count: usize, sample_rate: u32) -> std::time::Duration {
    if sample_rate == 0 {
        return std::time::Duration::ZERO;
    }
    std::time::Duration::from_secs_f64(sample_count as f64 / f64::from(sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_samples_from_le_bytes() {
        let bytes = [0x01, 0x00, 0xff, 0x7f, 0x00, 0x80, 0x42];
        assert_eq!(samples_from_le_bytes(&bytes), vec![1, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_normalize_amplifies_quiet_audio_up_to_max_gain() {
        let samples = vec![1000, -2000, 500];
        let out = normalize(&samples, 28_000, 3.0);
        // 28000 / 2000 = 14, capped at 3
        assert_eq!(out, vec![3000, -6000, 1500]);
    }

    #[test]
    fn test_normalize_reaches_target_peak() {
        let samples = vec![14_000, -7000];
        let out = normalize(&samples, 28_000, 3.0);
        assert_eq!(out, vec![28_000, -14_000]);
    }

    #[test]
    fn test_normalize_attenuates_loud_audio() {
        let samples = vec![i16::MIN, i16::MAX];
        let out = normalize(&samples, 28_000, 3.0);
        assert!(out.iter().all(|s| i32::from(*s).abs() <= 28_000));
    }

    #[test]
    fn test_normalize_silence_unchanged() {
        assert_eq!(normalize(&[0, 0, 0], 28_000, 3.0), vec![0, 0, 0]);
        assert!(normalize(&[], 28_000, 3.0).is_empty());
    }

    #[test]
    fn test_to_f32_range() {
        let out = to_f32(&[i16::MAX, 0]);
        assert!((out[0] - 1.0).abs() < f32::EPSILON);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_duration_of() {
        assert_eq!(duration_of(24_000, 24_000), Duration::from_secs(1));
        assert_eq!(duration_of(12_000, 24_000), Duration::from_millis(500));
        assert_eq!(duration_of(100, 0), Duration::ZERO);
    }
}
