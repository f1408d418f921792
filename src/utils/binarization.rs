//! 1-D adaptive thresholding of scanline profiles.

/// Threshold a 1-D profile against a sliding-window mean.
///
/// Window radius is `len / 32` clamped to [8, 64]. A sample is dark when it
/// falls below the local mean; in flat regions (local range under
/// `min_contrast`) the global midpoint decides instead, so quiet zones stay
/// white.
pub fn binarize_profile(samples: &[u8], min_contrast: u8) -> Vec<bool> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }
    let (min_v, max_v) = samples
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let global_mid = (min_v as u32 + max_v as u32) / 2;

    let win = (n / 32).clamp(8, 64);
    let mut prefix: Vec<u32> = Vec::with_capacity(n + 1);
    prefix.push(0);
    for &v in samples {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + v as u32);
    }

    (0..n)
        .map(|i| {
            let left = i.saturating_sub(win);
            let right = (i + win).min(n - 1);
            let window = &samples[left..=right];
            let (lo, hi) = window
                .iter()
                .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            let v = samples[i] as u32;
            if hi - lo < min_contrast {
                v < global_mid
            } else {
                let mean = (prefix[right + 1] - prefix[left]) / (right - left + 1) as u32;
                // halfway between local mean and global midpoint
                v < (mean + global_mid) / 2
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_quiet_zone_stays_white() {
        let mut samples = vec![230u8; 40];
        for k in 0..10 {
            let v = if k % 2 == 0 { 20 } else { 230 };
            samples.extend(std::iter::repeat_n(v, 4));
        }
        samples.extend(vec![230u8; 40]);
        let bits = binarize_profile(&samples, 30);
        assert!(bits[..40].iter().all(|&b| !b));
        assert!(bits[40]);
        assert!(!bits[44]);
        assert!(bits[samples.len() - 40..].iter().all(|&b| !b));
    }

    #[test]
    fn test_profile_follows_uneven_lighting() {
        // the same bars under a brightness ramp; a single global cut would lose the dark end
        let samples: Vec<u8> = (0..400)
            .map(|i| {
                let light = 120 + (i as u32 * 120 / 400) as u8;
                if (i / 6) % 2 == 0 { light - 90 } else { light }
            })
            .collect();
        let bits = binarize_profile(&samples, 24);
        for (i, &dark) in bits.iter().enumerate() {
            assert_eq!(dark, (i / 6) % 2 == 0, "sample {}", i);
        }
    }

    #[test]
    fn test_empty_profile() {
        assert!(binarize_profile(&[], 24).is_empty());
    }
}
