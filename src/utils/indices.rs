/// Map a 3D grid index to its linear position in row-major order.
pub fn linear_index(idx: [usize; 3], dims: [usize; 3]) -> usize {
    assert!(
        idx[0] < dims[0] && idx[1] < dims[1] && idx[2] < dims[2],
        "Grid index {:?} should be within dimensions {:?}",
        idx,
        dims,
    );
    (idx[0] * dims[1] + idx[1]) * dims[2] + idx[2]
}

/// Map a linear position back to its 3D grid index.
pub fn multi_index(idx: usize, dims: [usize; 3]) -> [usize; 3] {
    assert!(
        idx < dims[0] * dims[1] * dims[2],
        "Linear index {} should be less than the grid size {}",
        idx,
        dims[0] * dims[1] * dims[2],
    );
    let z = idx % dims[2];
    let r = idx / dims[2];
    [r / dims[1], r % dims[1], z]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let dims = [2, 3, 4];
        for i in 0..24 {
            assert_eq!(linear_index(multi_index(i, dims), dims), i);
        }
    }

    #[test]
    #[should_panic]
    fn rejects_out_of_range() {
        linear_index([2, 0, 0], [2, 3, 4]);
    }
}
