//! Property-based tests for the sequenced evaluator

#[cfg(test)]
mod tests {
    use crate::{evaluate, sequenced_flops};
    use cpconv_core::{DataLayout, FeatureMap};
    use cpconv_decomp::ConvFactors;
    use cpconv_kernels::{conv2d_reference, outputs_close, Conv2dConfig, Padding};
    use proptest::prelude::*;
    use scirs2_core::ndarray_ext::Array2;

    fn proptest_config() -> ProptestConfig {
        ProptestConfig {
            cases: 16,
            ..ProptestConfig::default()
        }
    }

    fn seeded_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(i, j)| {
            let x = (i * 31 + j * 17 + seed as usize * 7) % 23;
            x as f64 / 11.0 - 1.0
        })
    }

    fn padding_strategy() -> impl Strategy<Value = Padding> {
        prop_oneof![
            Just(Padding::Same),
            Just(Padding::Valid),
            (0usize..3, 0usize..3, 0usize..3, 0usize..3).prop_map(|(top, bottom, left, right)| {
                Padding::Explicit {
                    top,
                    bottom,
                    left,
                    right,
                }
            }),
        ]
    }

    proptest! {
        #![proptest_config(proptest_config())]

        #[test]
        fn prop_sequenced_matches_recomposed_reference(
            channels in 1usize..4,
            out_channels in 1usize..5,
            rank in 1usize..4,
            k_h in 1usize..4,
            k_w in 1usize..4,
            extra_h in 0usize..5,
            extra_w in 0usize..5,
            stride_h in 1usize..3,
            stride_w in 1usize..3,
            padding in padding_strategy(),
            nhwc in any::<bool>(),
            seed in 0u64..100,
        ) {
            let factors = ConvFactors::new(
                seeded_matrix(channels, rank, seed),
                seeded_matrix(k_h, rank, seed + 1),
                seeded_matrix(k_w, rank, seed + 2),
                seeded_matrix(rank, out_channels, seed + 3),
            ).unwrap();
            let layout = if nhwc { DataLayout::Nhwc } else { DataLayout::Nchw };
            let dims = [2, channels, k_h + extra_h, k_w + extra_w];
            let input = FeatureMap::<f64>::random_uniform_seeded(layout, dims, -1.0, 1.0, seed);
            let config = Conv2dConfig::default()
                .with_padding(padding)
                .with_strides(stride_h, stride_w);

            let kernel = factors.recompose().unwrap();
            let reference = conv2d_reference(&input, &kernel, &config).unwrap();
            let out = evaluate(&input, &factors, &config).unwrap();

            let plan = config.plan(dims[2], dims[3], k_h, k_w).unwrap();
            prop_assert_eq!(out.dims(), [2, out_channels, plan.out_h, plan.out_w]);
            prop_assert_eq!(out.layout(), layout);
            prop_assert!(outputs_close(&out.view(), &reference.view(), 1e-10, 1e-12));
        }

        #[test]
        fn prop_same_stride_one_preserves_spatial_size(
            h in 1usize..12,
            w in 1usize..12,
            k in 1usize..6,
        ) {
            let factors = ConvFactors::<f64>::zeros([k, k, 2, 3], 2).unwrap();
            let input = FeatureMap::<f64>::zeros(DataLayout::Nchw, [1, 2, h, w]);
            let out = evaluate(&input, &factors, &Conv2dConfig::default()).unwrap();
            prop_assert_eq!(out.dims(), [1, 3, h, w]);
        }

        #[test]
        fn prop_sequenced_flops_grow_with_rank(rank in 1usize..16) {
            let plan = Conv2dConfig::default().plan(16, 16, 3, 3).unwrap();
            let small = ConvFactors::<f64>::zeros([3, 3, 8, 8], rank).unwrap();
            let large = ConvFactors::<f64>::zeros([3, 3, 8, 8], rank + 1).unwrap();
            prop_assert!(
                sequenced_flops([1, 8, 16, 16], &small, &plan)
                    < sequenced_flops([1, 8, 16, 16], &large, &plan)
            );
        }
    }
}
