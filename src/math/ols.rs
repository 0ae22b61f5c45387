//! Least squares solvers.
//!
//! Two kinds of small linear problems show up in the method library:
//!
//! ```text
//! minimize ||y - X β||²                    (polynomial windows, exact splines)
//! minimize ||y - B c||² + λ ||D c||²       (penalized splines)
//! ```
//!
//! Both have an SVD path so tall, rank-deficient or badly scaled designs still
//! produce a solution instead of a panic. (Nalgebra's `QR::solve` only handles
//! square systems.) The penalized form is solved there as an ordinary problem
//! on the stacked design `[B; √λ D]`.
//!
//! B-spline designs are banded, so [`PenalizedSystem`] keeps the normal
//! equations `(BᵀB + λ DᵀD) c = Bᵀy` in band storage and solves each λ with a
//! banded Cholesky factorization in `O(n · w²)`. The dense SVD is only the
//! fallback when that factorization breaks down.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Moore-Penrose pseudo-inverse of a design matrix.
///
/// Row `j` of the result maps observations to the `j`-th fitted coefficient,
/// which lets callers precompute linear filter weights once and reuse them.
pub fn pseudo_inverse(x: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let pinv = x.clone().pseudo_inverse(1e-12).ok()?;
    if pinv.iter().all(|v| v.is_finite()) {
        Some(pinv)
    } else {
        None
    }
}

/// Solve `minimize ||y - B c||² + λ ||D c||²`.
pub fn solve_penalized(
    basis: &DMatrix<f64>,
    penalty: &DMatrix<f64>,
    y: &DVector<f64>,
    lambda: f64,
) -> Option<DVector<f64>> {
    let n = basis.nrows();
    let p = penalty.nrows();
    let cols = basis.ncols();
    let sqrt_lambda = lambda.max(0.0).sqrt();

    let mut stacked = DMatrix::<f64>::zeros(n + p, cols);
    stacked.view_mut((0, 0), (n, cols)).copy_from(basis);
    stacked
        .view_mut((n, 0), (p, cols))
        .copy_from(&(penalty * sqrt_lambda));

    let mut rhs = DVector::<f64>::zeros(n + p);
    rhs.rows_mut(0, n).copy_from(y);

    solve_least_squares(&stacked, &rhs)
}

/// Finite-difference operator of the given order on `m` coefficients.
///
/// Shape is `(m - order) × m`; an order of zero gives the identity.
pub fn difference_matrix(m: usize, order: usize) -> DMatrix<f64> {
    let mut d = DMatrix::<f64>::identity(m, m);
    for _ in 0..order.min(m) {
        let rows = d.nrows();
        if rows < 2 {
            return DMatrix::zeros(0, m);
        }
        let next = DMatrix::from_fn(rows - 1, m, |i, j| d[(i + 1, j)] - d[(i, j)]);
        d = next;
    }
    d
}

/// Sum of squared residuals `||y - X β||²`.
pub fn residual_sum_of_squares(x: &DMatrix<f64>, beta: &DVector<f64>, y: &DVector<f64>) -> f64 {
    (y - x * beta).norm_squared()
}

/// Coefficients of the `order`-th forward difference, e.g. `[1, -2, 1]` for 2.
fn difference_weights(order: usize) -> Vec<f64> {
    let mut weights = vec![1.0];
    for _ in 0..order {
        let mut next = vec![0.0; weights.len() + 1];
        for (j, w) in weights.iter().enumerate() {
            next[j] -= w;
            next[j + 1] += w;
        }
        weights = next;
    }
    weights
}

/// Symmetric matrix with `width` non-zero diagonals below the main one.
///
/// Only the lower band is stored, row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct BandMatrix {
    size: usize,
    width: usize,
    data: Vec<f64>,
}

impl BandMatrix {
    pub fn zeros(size: usize, width: usize) -> Self {
        Self {
            size,
            width,
            data: vec![0.0; size * (width + 1)],
        }
    }

    fn index(&self, i: usize, j: usize) -> Option<usize> {
        let (i, j) = if i >= j { (i, j) } else { (j, i) };
        (i - j <= self.width && i < self.size).then(|| i * (self.width + 1) + (i - j))
    }

    /// Entry `(i, j)`; zero outside the band.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.index(i, j).map_or(0.0, |at| self.data[at])
    }

    /// Add `value` to `(i, j)` (and so to `(j, i)`). Entries outside the band are ignored.
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        if let Some(at) = self.index(i, j) {
            self.data[at] += value;
        }
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        if let Some(at) = self.index(i, j) {
            self.data[at] = value;
        }
    }

    /// `self + factor · other` for two matrices of the same shape.
    pub fn plus_scaled(&self, other: &BandMatrix, factor: f64) -> BandMatrix {
        let mut out = self.clone();
        for (a, b) in out.data.iter_mut().zip(&other.data) {
            *a += factor * b;
        }
        out
    }

    /// Solve `A x = rhs` through `A = L Lᵀ`.
    ///
    /// Returns `None` when `A` is not numerically positive definite.
    pub fn cholesky_solve(&self, rhs: &[f64]) -> Option<Vec<f64>> {
        let (n, w) = (self.size, self.width);
        if rhs.len() != n {
            return None;
        }

        let mut l = self.clone();
        for j in 0..n {
            let mut diag = l.get(j, j);
            for k in j.saturating_sub(w)..j {
                diag -= l.get(j, k).powi(2);
            }
            if !(diag.is_finite() && diag > 0.0) {
                return None;
            }
            let diag = diag.sqrt();
            l.set(j, j, diag);

            for i in (j + 1)..n.min(j + w + 1) {
                let mut v = l.get(i, j);
                for k in i.saturating_sub(w)..j {
                    v -= l.get(i, k) * l.get(j, k);
                }
                l.set(i, j, v / diag);
            }
        }

        let mut z = rhs.to_vec();
        for i in 0..n {
            let mut v = z[i];
            for k in i.saturating_sub(w)..i {
                v -= l.get(i, k) * z[k];
            }
            z[i] = v / l.get(i, i);
        }
        for i in (0..n).rev() {
            let mut v = z[i];
            for k in (i + 1)..n.min(i + w + 1) {
                v -= l.get(k, i) * z[k];
            }
            z[i] = v / l.get(i, i);
        }

        z.iter().all(|v| v.is_finite()).then_some(z)
    }
}

/// One row of a sparse design: index of the first non-zero column and the
/// consecutive non-zero values from there.
pub type SparseRow = (usize, Vec<f64>);

/// `minimize ||y - B c||² + λ ||D c||²` for a banded `B` and a difference
/// penalty `D`, set up once and solved for many λ.
#[derive(Debug, Clone)]
pub struct PenalizedSystem {
    rows: Vec<SparseRow>,
    y: Vec<f64>,
    n_cols: usize,
    order: usize,
    gram: BandMatrix,
    penalty_gram: BandMatrix,
    rhs: Vec<f64>,
}

impl PenalizedSystem {
    /// Build `BᵀB`, `DᵀD` (difference `order`) and `Bᵀy`.
    pub fn new(rows: Vec<SparseRow>, y: Vec<f64>, n_cols: usize, order: usize) -> Self {
        let width = rows
            .iter()
            .map(|(_, values)| values.len().saturating_sub(1))
            .max()
            .unwrap_or(0)
            .max(order);

        let mut gram = BandMatrix::zeros(n_cols, width);
        let mut rhs = vec![0.0; n_cols];
        for ((first, values), yi) in rows.iter().zip(&y) {
            for (a, va) in values.iter().enumerate() {
                rhs[first + a] += va * yi;
                for (b, vb) in values.iter().enumerate().take(a + 1) {
                    gram.add(first + a, first + b, va * vb);
                }
            }
        }

        let weights = difference_weights(order);
        let mut penalty_gram = BandMatrix::zeros(n_cols, width);
        for start in 0..n_cols.saturating_sub(order) {
            for (a, wa) in weights.iter().enumerate() {
                for (b, wb) in weights.iter().enumerate().take(a + 1) {
                    penalty_gram.add(start + a, start + b, wa * wb);
                }
            }
        }

        Self {
            rows,
            y,
            n_cols,
            order,
            gram,
            penalty_gram,
            rhs,
        }
    }

    /// `||B||² / ||D||²` (Frobenius), which puts λ = 1 on the scale of the data.
    pub fn penalty_scale(&self) -> f64 {
        let design: f64 = self.rows.iter().flat_map(|(_, v)| v).map(|v| v * v).sum();
        let weights: f64 = difference_weights(self.order).iter().map(|w| w * w).sum();
        let penalty = self.n_cols.saturating_sub(self.order) as f64 * weights;
        if penalty > 0.0 { design / penalty } else { 1.0 }
    }

    /// Coefficients for one λ.
    pub fn solve(&self, lambda: f64) -> Option<Vec<f64>> {
        let lhs = self.gram.plus_scaled(&self.penalty_gram, lambda.max(0.0));
        if let Some(coefs) = lhs.cholesky_solve(&self.rhs) {
            return Some(coefs);
        }

        let design = self.dense_design();
        let y = DVector::from_column_slice(&self.y);
        let coefs = if lambda > 0.0 {
            solve_penalized(&design, &difference_matrix(self.n_cols, self.order), &y, lambda)?
        } else {
            solve_least_squares(&design, &y)?
        };
        Some(coefs.iter().copied().collect())
    }

    /// `||y - B c||²`.
    pub fn residual_sum_of_squares(&self, coefs: &[f64]) -> f64 {
        self.rows
            .iter()
            .zip(&self.y)
            .map(|((first, values), yi)| {
                let fitted: f64 = values.iter().zip(&coefs[*first..]).map(|(v, c)| v * c).sum();
                (yi - fitted).powi(2)
            })
            .sum()
    }

    fn dense_design(&self) -> DMatrix<f64> {
        let mut out = DMatrix::<f64>::zeros(self.rows.len(), self.n_cols);
        for (r, (first, values)) in self.rows.iter().enumerate() {
            for (a, v) in values.iter().enumerate() {
                out[(r, first + a)] = *v;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn pseudo_inverse_recovers_line_coefficients() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, -1.0, 1.0, 0.0, 1.0, 1.0]);
        let pinv = pseudo_inverse(&x).unwrap();
        let y = DVector::from_row_slice(&[1.0, 3.0, 5.0]);
        let beta = &pinv * &y;
        assert!((beta[0] - 3.0).abs() < 1e-10);
        assert!((beta[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn second_difference_matrix_shape_and_rows() {
        let d = difference_matrix(5, 2);
        assert_eq!(d.shape(), (3, 5));
        let row: Vec<f64> = d.row(0).iter().copied().collect();
        assert_eq!(row, vec![1.0, -2.0, 1.0, 0.0, 0.0]);
        assert_eq!(difference_matrix(2, 2).nrows(), 0);
    }

    #[test]
    fn heavy_penalty_flattens_towards_line() {
        // Identity basis: the unpenalized solution reproduces y exactly,
        // a huge second-difference penalty collapses it onto the best line.
        let y = DVector::from_row_slice(&[0.0, 1.0, 0.0, 1.0, 0.0]);
        let b = DMatrix::<f64>::identity(5, 5);
        let d = difference_matrix(5, 2);

        let exact = solve_penalized(&b, &d, &y, 0.0).unwrap();
        assert!((exact - &y).norm() < 1e-9);

        let stiff = solve_penalized(&b, &d, &y, 1e8).unwrap();
        let second_diff = &d * &stiff;
        assert!(second_diff.norm() < 1e-4);
        assert!(residual_sum_of_squares(&b, &stiff, &y) > 1.0);
    }

    fn random_rows(n: usize) -> Vec<SparseRow> {
        (0..n)
            .map(|i| {
                let first = i.saturating_sub(1).min(n - 3);
                let t = i as f64 * 0.37;
                (first, vec![0.2 + t.sin().abs(), 0.6, 0.2 + t.cos().abs()])
            })
            .collect()
    }

    #[test]
    fn difference_weights_follow_binomials() {
        assert_eq!(difference_weights(0), vec![1.0]);
        assert_eq!(difference_weights(1), vec![-1.0, 1.0]);
        assert_eq!(difference_weights(2), vec![1.0, -2.0, 1.0]);
        assert_eq!(difference_weights(3), vec![-1.0, 3.0, -3.0, 1.0]);
    }

    #[test]
    fn band_cholesky_matches_dense_solve() {
        // Tridiagonal SPD matrix: 4 on the diagonal, -1 beside it.
        let n = 6;
        let mut band = BandMatrix::zeros(n, 1);
        for i in 0..n {
            band.add(i, i, 4.0);
            if i > 0 {
                band.add(i, i - 1, -1.0);
            }
        }
        assert_eq!(band.get(2, 3), -1.0);
        assert_eq!(band.get(0, 4), 0.0);

        let dense = DMatrix::from_fn(n, n, |i, j| band.get(i, j));
        let rhs: Vec<f64> = (0..n).map(|i| i as f64 - 2.0).collect();
        let x = band.cholesky_solve(&rhs).unwrap();
        let expected = dense.lu().solve(&DVector::from_vec(rhs)).unwrap();
        for (a, b) in x.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn band_cholesky_rejects_indefinite_matrices() {
        let mut band = BandMatrix::zeros(2, 1);
        band.add(0, 0, 1.0);
        band.add(1, 0, 2.0);
        band.add(1, 1, 1.0);
        assert!(band.cholesky_solve(&[1.0, 1.0]).is_none());
    }

    #[test]
    fn penalized_system_agrees_with_stacked_svd() {
        let n = 12;
        let rows = random_rows(n);
        let y: Vec<f64> = (0..n).map(|i| (i as f64 * 0.5).sin()).collect();
        let system = PenalizedSystem::new(rows, y.clone(), n, 2);

        let design = system.dense_design();
        let penalty = difference_matrix(n, 2);
        let target = DVector::from_vec(y);
        for lambda in [0.0, 0.1, 10.0] {
            let banded = system.solve(lambda).unwrap();
            let dense = solve_penalized(&design, &penalty, &target, lambda).unwrap();
            for (a, b) in banded.iter().zip(dense.iter()) {
                assert!((a - b).abs() < 1e-8, "lambda {lambda}: {a} vs {b}");
            }
            let rss = residual_sum_of_squares(&design, &dense, &target);
            assert!((system.residual_sum_of_squares(&banded) - rss).abs() < 1e-8);
        }
    }

    #[test]
    fn penalty_scale_uses_frobenius_norms() {
        let rows = vec![(0, vec![1.0]), (1, vec![1.0]), (2, vec![1.0]), (3, vec![1.0])];
        let system = PenalizedSystem::new(rows, vec![0.0; 4], 4, 2);
        assert!((system.penalty_scale() - 4.0 / 12.0).abs() < 1e-12);
    }
}
