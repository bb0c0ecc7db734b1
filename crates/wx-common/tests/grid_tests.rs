//! Comprehensive tests for Grid construction and reshape behavior.

use wx_common::error::GridError;
use wx_common::grid::Grid;

// ============================================================================
// Square reshape tests
// ============================================================================

#[test]
fn test_reshape_two_by_two() {
    let grid = Grid::from_flat_square(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(grid.width(), 2);
    assert_eq!(grid.height(), 2);
    assert_eq!(grid.row(0).unwrap(), &[1.0, 2.0]);
    assert_eq!(grid.row(1).unwrap(), &[3.0, 4.0]);
}

#[test]
fn test_reshape_single_element() {
    let grid = Grid::from_flat_square(vec![42.0]).unwrap();
    assert_eq!(grid.width(), 1);
    assert_eq!(grid.height(), 1);
    assert_eq!(grid.get(0, 0), Some(42.0));
}

#[test]
fn test_reshape_inference_sized() {
    // 448x448 is the shape hosted inference responses come back in.
    let grid = Grid::from_flat_square(vec![0.0; 448 * 448]).unwrap();
    assert_eq!(grid.width(), 448);
    assert_eq!(grid.height(), 448);
}

#[test]
fn test_reshape_preserves_row_major_order() {
    let values: Vec<f32> = (0..9).map(|v| v as f32).collect();
    let grid = Grid::from_flat_square(values).unwrap();
    assert_eq!(grid.row(0).unwrap(), &[0.0, 1.0, 2.0]);
    assert_eq!(grid.row(1).unwrap(), &[3.0, 4.0, 5.0]);
    assert_eq!(grid.row(2).unwrap(), &[6.0, 7.0, 8.0]);
}

#[test]
fn test_reshape_rejects_non_square_lengths() {
    for len in [2usize, 3, 5, 8, 15, 448 * 448 - 1, 448 * 448 + 1] {
        let err = Grid::from_flat_square(vec![0.0; len]).unwrap_err();
        match err {
            GridError::NotSquare(reported) => assert_eq!(reported, len),
            other => panic!("expected NotSquare, got {other:?}"),
        }
    }
}

#[test]
fn test_reshape_rejects_empty() {
    assert!(matches!(
        Grid::from_flat_square(Vec::new()),
        Err(GridError::NotSquare(0))
    ));
}

#[test]
fn test_reshape_never_truncates() {
    // 12 elements would "fit" a 3x3 if truncated; it must error instead.
    let err = Grid::from_flat_square(vec![1.0; 12]).unwrap_err();
    assert!(matches!(err, GridError::NotSquare(12)));
}

// ============================================================================
// Explicit-dimension construction
// ============================================================================

#[test]
fn test_new_rectangular() {
    let grid = Grid::new(4, 2, vec![0.0; 8]).unwrap();
    assert_eq!(grid.width(), 4);
    assert_eq!(grid.height(), 2);
    assert_eq!(grid.values().len(), 8);
}

#[test]
fn test_new_size_mismatch() {
    let err = Grid::new(4, 2, vec![0.0; 7]).unwrap_err();
    match err {
        GridError::SizeMismatch {
            width,
            height,
            actual,
        } => {
            assert_eq!(width, 4);
            assert_eq!(height, 2);
            assert_eq!(actual, 7);
        }
        other => panic!("expected SizeMismatch, got {other:?}"),
    }
}

#[test]
fn test_new_zero_extent() {
    assert!(matches!(
        Grid::new(0, 5, vec![]),
        Err(GridError::Empty { .. })
    ));
    assert!(matches!(
        Grid::new(5, 0, vec![]),
        Err(GridError::Empty { .. })
    ));
}

// ============================================================================
// Accessors
// ============================================================================

#[test]
fn test_get_bounds() {
    let grid = Grid::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(grid.get(0, 0), Some(1.0));
    assert_eq!(grid.get(1, 1), Some(4.0));
    assert_eq!(grid.get(2, 0), None);
    assert_eq!(grid.get(0, 2), None);
    assert!(grid.row(2).is_none());
}

#[test]
fn test_flip_vertical_round_trip() {
    let grid = Grid::new(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let flipped = grid.flipped_vertical();
    assert_eq!(flipped.row(0).unwrap(), &[4.0, 5.0, 6.0]);
    assert_eq!(flipped.flipped_vertical(), grid);
}
