//! Integration tests for cpconv-core
//!
//! These tests verify end-to-end functionality and cross-module interactions.

use cpconv_core::{DataLayout, DenseND, FeatureMap, KernelTensor};

#[test]
fn test_kernel_unfold_fold_roundtrip() {
    let data = DenseND::<f64>::from_vec((0..72).map(|x| x as f64).collect(), &[3, 3, 2, 4]).unwrap();
    let kernel = KernelTensor::new(data.clone()).unwrap();
    let dense = kernel.to_dense();

    for mode in 0..4 {
        let unfolded = dense.unfold(mode).unwrap();
        let folded = DenseND::fold(&unfolded, &[3, 3, 2, 4], mode).unwrap();

        for i in 0..3 {
            for j in 0..3 {
                for c in 0..2 {
                    for t in 0..4 {
                        let orig = data[&[i, j, c, t]];
                        let result = folded[&[i, j, c, t]];
                        assert!(
                            (orig - result).abs() < 1e-12,
                            "Mismatch at [{}, {}, {}, {}] for mode {}",
                            i,
                            j,
                            c,
                            t,
                            mode
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_feature_map_from_permuted_dense() {
    // NCHW data permuted into NHWC order without copying
    let nchw = DenseND::<f64>::random_uniform_seeded(&[2, 3, 4, 5], 0.0, 1.0, 21);
    let nhwc_dense = nchw.permute(&DataLayout::Nhwc.from_nchw_axes()).unwrap();
    assert!(!nhwc_dense.is_contiguous());

    let map = FeatureMap::new(nhwc_dense, DataLayout::Nhwc).unwrap();
    assert_eq!(map.dims(), [2, 3, 4, 5]);
    assert_eq!(map.shape(), &[2, 4, 5, 3]);

    for n in 0..2 {
        for c in 0..3 {
            for y in 0..4 {
                for x in 0..5 {
                    assert_eq!(map.view()[[n, y, x, c]], nchw[&[n, c, y, x]]);
                    assert_eq!(map.nchw_view()[[n, c, y, x]], nchw[&[n, c, y, x]]);
                }
            }
        }
    }
}

#[test]
fn test_layout_shape_mapping() {
    let dims = [1, 4, 16, 16];
    assert_eq!(DataLayout::Nchw.shape(dims), [1, 4, 16, 16]);
    assert_eq!(DataLayout::Nhwc.shape(dims), [1, 16, 16, 4]);

    let map = FeatureMap::<f32>::zeros(DataLayout::Nhwc, dims);
    assert_eq!(map.batch(), 1);
    assert_eq!(map.channels(), 4);
    assert_eq!(map.height(), 16);
    assert_eq!(map.width(), 16);
    assert_eq!(map.to_dense().shape(), &[1, 16, 16, 4]);
}

#[test]
fn test_kernel_rejects_non_rank4() {
    assert!(KernelTensor::new(DenseND::<f64>::zeros(&[9, 4, 8])).is_err());
    assert!(KernelTensor::new(DenseND::<f64>::zeros(&[1, 3, 3, 4, 8])).is_err());
}
