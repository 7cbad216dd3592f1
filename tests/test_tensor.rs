use light_net::tensor::*;
use light_net::Error;

#[test]
fn test_from_rows() {
    let tensor1 = Tensor::from_rows(&[vec![0, 1, 2], vec![3, 4, 5]]).unwrap();
    let tensor2 = Tensor::new((0..6).collect(), vec![2, 3]).unwrap();
    assert_eq!(tensor1, tensor2);
}

#[test]
fn test_from_ragged_rows() {
    assert!(matches!(
        Tensor::from_rows(&[vec![0, 1], vec![2]]),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn test_get_3x3x4() {
    let matrix = Tensor::new((0..(3 * 3 * 4)).collect(), vec![3, 3, 4]).unwrap();
    assert_eq!(*matrix.get(&[0, 0, 0]).unwrap(), 0);
    assert_eq!(*matrix.get(&[2, 2, 3]).unwrap(), 3 * 3 * 4 - 1);
    assert_eq!(matrix.row_len(), 12);
    assert_eq!(matrix.row(1).unwrap()[0], 12);
}

#[test]
fn test_set_then_get() {
    let mut matrix = Tensor::<f64>::zeros(vec![2, 2]).unwrap();
    matrix.set(&[1, 0], 2.5).unwrap();
    assert_eq!(matrix.data(), &[0.0, 0.0, 2.5, 0.0]);
    assert!(matrix.set(&[2, 0], 1.0).is_err());
}

#[test]
fn test_split_and_reassemble_batch() {
    let batch = Tensor::new((0..12).collect(), vec![4, 3]).unwrap();
    let mut reassembled = Tensor::zeros(vec![4, 3]).unwrap();
    let mut single = Tensor::zeros(vec![1, 3]).unwrap();
    for i in (0..4).rev() {
        batch.slice_copy(i, 1, &mut single).unwrap();
        reassembled.set_slice(i, &single).unwrap();
    }
    assert_eq!(reassembled, batch);
}

#[test]
fn test_length_mismatch() {
    assert_eq!(
        Tensor::new(vec![1.0, 2.0, 3.0], vec![2, 2]),
        Err(Error::ShapeMismatch {
            expected: vec![4],
            got: vec![3]
        })
    );
}
