//! Loudness scale and two-stage gating

/// Blocks quieter than this never count towards integrated loudness
pub const ABSOLUTE_GATE_LUFS: f64 = -70.0;

/// Relative gate, below the loudness of the absolute-gated blocks
pub const RELATIVE_GATE_LU: f64 = -10.0;

/// Loudness of a channel-weighted mean square, in LUFS
///
/// Zero energy gives negative infinity.
pub fn loudness(mean_square: f64) -> f64 {
    -0.691 + 10.0 * mean_square.log10()
}

/// Integrated loudness over gating blocks (each a 400 ms mean square)
///
/// Returns negative infinity when no block passes the absolute gate.
pub fn gated_loudness(blocks: &[f64]) -> f64 {
    let (sum, count) = blocks
        .iter()
        .filter(|z| loudness(**z) > ABSOLUTE_GATE_LUFS)
        .fold((0.0, 0usize), |(sum, count), z| (sum + z, count + 1));
    if count == 0 {
        return f64::NEG_INFINITY;
    }

    let relative_gate = loudness(sum / count as f64) + RELATIVE_GATE_LU;
    let (sum, count) = blocks
        .iter()
        .filter(|z| {
            let l = loudness(**z);
            l > ABSOLUTE_GATE_LUFS && l > relative_gate
        })
        .fold((0.0, 0usize), |(sum, count), z| (sum + z, count + 1));
    if count == 0 {
        return f64::NEG_INFINITY;
    }

    loudness(sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_sine_reference() {
        // A full-scale 1 kHz sine has mean square 0.5 on each of two channels
        assert!((loudness(1.0) - -0.691).abs() < 1e-12);
        assert_eq!(loudness(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn silence_is_gated_out() {
        assert_eq!(gated_loudness(&[0.0; 10]), f64::NEG_INFINITY);
        assert_eq!(gated_loudness(&[]), f64::NEG_INFINITY);
    }

    #[test]
    fn quiet_blocks_below_relative_gate_are_ignored() {
        // -20.691 LUFS blocks plus -60.691 LUFS blocks
        let mut blocks = vec![0.01; 10];
        blocks.extend([1e-6; 10]);
        assert!((gated_loudness(&blocks) - loudness(0.01)).abs() < 1e-9);
    }

    #[test]
    fn blocks_below_absolute_gate_are_ignored() {
        let mut blocks = vec![0.01; 4];
        blocks.extend([1e-9; 40]);
        assert!((gated_loudness(&blocks) - loudness(0.01)).abs() < 1e-9);
    }

    mod properties {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn uniform_blocks_integrate_to_their_own_loudness(
                mean_square in 1e-6f64..4.0,
                count in 1usize..64,
            ) {
                let blocks = vec![mean_square; count];
                prop_assert!((gated_loudness(&blocks) - loudness(mean_square)).abs() < 1e-9);
            }

            #[test]
            fn gating_lies_between_ungated_mean_and_loudest_block(
                blocks in prop::collection::vec(1e-6f64..1.0, 1..64),
            ) {
                let loudest = blocks.iter().copied().fold(0.0, f64::max);
                let mean = blocks.iter().sum::<f64>() / blocks.len() as f64;
                let integrated = gated_loudness(&blocks);
                prop_assert!(integrated <= loudness(loudest) + 1e-9);
                prop_assert!(integrated >= loudness(mean) - 1e-9);
            }
        }
    }
}
