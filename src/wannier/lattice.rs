/* ************************************************************************ **
** This file is part of mlwf, and is licensed under EITHER the MIT license  **
** or the Apache 2.0 license, at your option.                               **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
**                                                                          **
** Be aware that not all of mlwf is provided under this permissive license, **
** and that the project as a whole is licensed under the GPL 3.0.           **
** ************************************************************************ */

//! Small fixed-size vector helpers for cells and positions.
//!
//! Cells are stored with lattice vectors as rows.  Fractional coordinates `s`
//! and Cartesian coordinates `r` are related by `r = s · cell`.

pub type V3 = [f64; 3];
pub type M33 = [[f64; 3]; 3];

pub fn dot(a: &V3, b: &V3) -> f64 { a[0] * b[0] + a[1] * b[1] + a[2] * b[2] }

pub fn norm(a: &V3) -> f64 { dot(a, a).sqrt() }

pub fn sub(a: &V3, b: &V3) -> V3 { [a[0] - b[0], a[1] - b[1], a[2] - b[2]] }

pub fn add(a: &V3, b: &V3) -> V3 { [a[0] + b[0], a[1] + b[1], a[2] + b[2]] }

pub fn cross(a: &V3, b: &V3) -> V3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn volume(cell: &M33) -> f64 { dot(&cell[0], &cross(&cell[1], &cell[2])).abs() }

/// `r = s · cell`
pub fn frac_to_cart(frac: &V3, cell: &M33) -> V3 {
    let mut out = [0.0; 3];
    for i in 0..3 {
        for k in 0..3 {
            out[k] += frac[i] * cell[i][k];
        }
    }
    out
}

/// Inverse of [`frac_to_cart`].  `None` for a singular cell.
pub fn cart_to_frac(cart: &V3, cell: &M33) -> Option<V3> {
    let det = dot(&cell[0], &cross(&cell[1], &cell[2]));
    if det.abs() < 1e-12 {
        return None;
    }
    // rows of the inverse transpose are the reciprocal vectors (without 2π)
    let recip = [
        cross(&cell[1], &cell[2]),
        cross(&cell[2], &cell[0]),
        cross(&cell[0], &cell[1]),
    ];
    Some([
        dot(cart, &recip[0]) / det,
        dot(cart, &recip[1]) / det,
        dot(cart, &recip[2]) / det,
    ])
}

/// Lattice vector of an integer translation.
pub fn translation(t: &[i32; 3], cell: &M33) -> V3 {
    frac_to_cart(&[t[0] as f64, t[1] as f64, t[2] as f64], cell)
}

/// Scale each lattice vector by the matching repeat count.
pub fn supercell(cell: &M33, repeat: [usize; 3]) -> M33 {
    let mut out = *cell;
    for i in 0..3 {
        for k in 0..3 {
            out[i][k] *= repeat[i] as f64;
        }
    }
    out
}

/// The metric tensor `cell · cellᵀ`.
pub fn metric(cell: &M33) -> M33 {
    let mut g = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            g[i][j] = dot(&cell[i], &cell[j]);
        }
    }
    g
}

/// All integer translations `T` such that every point within `cutoff` of a point
/// in the unit cell lies in some image `cell + T`.
pub fn images_within(cell: &M33, cutoff: f64) -> Vec<[i32; 3]> {
    let vol = volume(cell);
    let mut reach = [0i32; 3];
    for i in 0..3 {
        let (j, k) = ((i + 1) % 3, (i + 2) % 3);
        let height = vol / norm(&cross(&cell[j], &cell[k]));
        reach[i] = (cutoff / height).ceil() as i32 + 1;
    }

    let mut out = vec![];
    for a in -reach[0]..=reach[0] {
        for b in -reach[1]..=reach[1] {
            for c in -reach[2]..=reach[2] {
                out.push([a, b, c]);
            }
        }
    }
    out
}

/// Fractional coordinates of a point of a regular grid over the unit cell.
pub fn grid_point(index: (usize, usize, usize), shape: &[usize]) -> V3 {
    [
        index.0 as f64 / shape[0] as f64,
        index.1 as f64 / shape[1] as f64,
        index.2 as f64 / shape[2] as f64,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRICLINIC: M33 = [
        [3.0, 0.2, -0.1],
        [0.5, 4.0, 0.3],
        [-0.4, 0.7, 5.0],
    ];

    #[test]
    fn frac_cart_inverse() {
        let frac = [0.1, -0.7, 2.3];
        let cart = frac_to_cart(&frac, &TRICLINIC);
        assert_close!(abs=1e-12, cart_to_frac(&cart, &TRICLINIC).unwrap(), frac);
    }

    #[test]
    fn singular_cell() {
        let cell = [[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(cart_to_frac(&[1.0, 1.0, 1.0], &cell).is_none());
    }

    #[test]
    fn images_cover_cutoff() {
        let cell = [[2.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 11.0]];
        let images = images_within(&cell, 4.5);
        let max = |i: usize| images.iter().map(|t| t[i]).max().unwrap();
        assert_eq!((max(0), max(1), max(2)), (4, 2, 2));
        assert!(images.contains(&[0, 0, 0]));
    }
}
