//! Property-based tests for tensor kernel operations
//!
//! These tests verify mathematical properties that should hold for all valid inputs

use super::*;
use cpconv_core::{DataLayout, FeatureMap, KernelTensor};
use proptest::prelude::*;
use scirs2_core::ndarray_ext::{Array, Array2, IxDyn};

/// Strategy to generate small matrix dimensions
fn small_matrix_dims() -> impl Strategy<Value = (usize, usize, usize)> {
    (1usize..12, 1usize..12, 1usize..6)
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

fn seeded_matrix(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        (((i * 31 + j * 17) as u64 ^ seed) % 97) as f64 / 48.5 - 1.0
    })
}

proptest! {
    /// Khatri-Rao output has (I·J, R) shape and each entry is the product of its sources
    #[test]
    fn test_khatri_rao_entries((rows_a, rows_b, cols) in small_matrix_dims(), seed in any::<u64>()) {
        let a = seeded_matrix(rows_a, cols, seed);
        let b = seeded_matrix(rows_b, cols, seed.wrapping_add(1));

        let result = khatri_rao(&a.view(), &b.view()).unwrap();
        prop_assert_eq!(result.shape(), &[rows_a * rows_b, cols]);

        for ia in 0..rows_a {
            for ib in 0..rows_b {
                for r in 0..cols {
                    prop_assert_eq!(result[[ia * rows_b + ib, r]], a[[ia, r]] * b[[ib, r]]);
                }
            }
        }
    }

    /// SAME with unit stride preserves the spatial size; VALID shrinks by k - 1
    #[test]
    fn test_padding_unit_stride_sizes(
        in_h in 1usize..40,
        in_w in 1usize..40,
        k_h in 1usize..8,
        k_w in 1usize..8,
    ) {
        let same = Padding::Same.plan(in_h, in_w, k_h, k_w, 1, 1).unwrap();
        prop_assert_eq!((same.out_h, same.out_w), (in_h, in_w));
        prop_assert_eq!(same.pad_top + same.pad_bottom, k_h - 1);
        prop_assert!(same.pad_bottom >= same.pad_top);

        if in_h >= k_h && in_w >= k_w {
            let valid = Padding::Valid.plan(in_h, in_w, k_h, k_w, 1, 1).unwrap();
            prop_assert_eq!((valid.out_h, valid.out_w), (in_h - k_h + 1, in_w - k_w + 1));
        } else {
            prop_assert!(Padding::Valid.plan(in_h, in_w, k_h, k_w, 1, 1).is_err());
        }
    }

    /// SAME output is ceil(in / stride) and the last window stays inside the padded input
    #[test]
    fn test_padding_same_strided(
        input in 1usize..50,
        kernel in 1usize..8,
        stride in 1usize..5,
    ) {
        let plan = Padding::Same.plan(input, input, kernel, kernel, stride, stride).unwrap();
        prop_assert_eq!(plan.out_h, input.div_ceil(stride));
        let padded = input + plan.pad_top + plan.pad_bottom;
        prop_assert!((plan.out_h - 1) * stride + kernel <= padded);
        prop_assert!(plan.pad_bottom - plan.pad_top <= 1);
    }

    /// to_matrix followed by from_matrix restores the tensor for any row-axis choice
    #[test]
    fn test_to_from_matrix_roundtrip(
        dims in prop::collection::vec(1usize..5, 1..=4),
        pick in any::<u8>(),
    ) {
        let n: usize = dims.iter().product();
        let a = Array::from_shape_vec(IxDyn(&dims), (0..n).map(|x| x as f64).collect()).unwrap();
        let row_axes: Vec<usize> = (0..dims.len()).filter(|ax| pick & (1 << ax) != 0).collect();

        let m = to_matrix(&a.view(), &row_axes).unwrap();
        let back = from_matrix(&m, &dims, &row_axes).unwrap();
        prop_assert_eq!(back, a);
    }

    /// Full convolution output shape always equals the padding plan
    #[test]
    fn test_reference_conv_shape(
        padding in padding_strategy(),
        stride_h in 1usize..3,
        stride_w in 1usize..3,
        layout in prop_oneof![Just(DataLayout::Nchw), Just(DataLayout::Nhwc)],
        seed in any::<u64>(),
    ) {
        let input = FeatureMap::<f64>::random_uniform_seeded(layout, [1, 2, 6, 5], -1.0, 1.0, seed);
        let kernel = KernelTensor::<f64>::random_uniform_seeded([3, 3, 2, 3], -1.0, 1.0, seed ^ 1);
        let config = Conv2dConfig { padding, stride_h, stride_w };

        let plan = config.plan(6, 5, 3, 3).unwrap();
        let out = conv2d_reference(&input, &kernel, &config).unwrap();
        prop_assert_eq!(out.layout(), layout);
        prop_assert_eq!(out.dims(), [1, 3, plan.out_h, plan.out_w]);
    }

    /// Relative error is zero against itself and scale invariant
    #[test]
    fn test_reconstruction_error_scale_invariant(
        rows in 1usize..8,
        cols in 1usize..8,
        scale in 0.1f64..10.0,
        seed in any::<u64>(),
    ) {
        let a = seeded_matrix(rows, cols, seed) + 2.0;
        let b = a.mapv(|x| x * 1.01);
        prop_assert_eq!(reconstruction_error(&a.view(), &a.view()), 0.0);

        let e1 = reconstruction_error(&a.view(), &b.view());
        let e2 = reconstruction_error(&a.mapv(|x| x * scale).view(), &b.mapv(|x| x * scale).view());
        prop_assert!((e1 - 0.01).abs() < 1e-9);
        prop_assert!((e1 - e2).abs() < 1e-9);
    }
}
