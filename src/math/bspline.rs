//! B-spline basis on a clamped knot vector.
//!
//! Knots are placed the way FITPACK does for interpolating splines, so a basis
//! built from `m` distinct abscissae has exactly `m` coefficients and the
//! square collocation matrix is non-singular (Schoenberg-Whitney):
//!
//! - boundary knots are repeated `k + 1` times at the first and last abscissa
//! - odd `k`: interior knots sit on the data, skipping `(k + 1) / 2` points at
//!   each end
//! - even `k`: interior knots sit halfway between consecutive data points
//!
//! Basis values come from the Cox-de Boor triangle (only the `k + 1` non-zero
//! functions at a point are computed). Outside the knot range the boundary
//! polynomial piece is continued, which is what extrapolation means here.

use nalgebra::DMatrix;

#[derive(Debug, Clone)]
pub struct BSplineBasis {
    knots: Vec<f64>,
    degree: usize,
}

impl BSplineBasis {
    /// Basis for `xs` (strictly increasing, at least `degree + 1` values).
    pub fn interpolating(xs: &[f64], degree: usize) -> Self {
        let m = xs.len();
        let k = degree;
        let first = xs[0];
        let last = xs[m - 1];

        let mut knots = Vec::with_capacity(m + k + 1);
        knots.extend(std::iter::repeat_n(first, k + 1));
        if k % 2 == 1 {
            let skip = (k + 1) / 2;
            for &x in &xs[skip..m - skip] {
                knots.push(x);
            }
        } else {
            let skip = k / 2;
            for j in skip..(m - 1 - skip) {
                knots.push(0.5 * (xs[j] + xs[j + 1]));
            }
        }
        knots.extend(std::iter::repeat_n(last, k + 1));

        Self { knots, degree }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn n_coefficients(&self) -> usize {
        self.knots.len() - self.degree - 1
    }

    /// Domain covered by the knots.
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[self.degree], self.knots[self.n_coefficients()])
    }

    /// Knot span index `i` with `knots[i] <= x < knots[i + 1]`, clamped to the
    /// first / last non-empty span.
    fn span(&self, x: f64) -> usize {
        let k = self.degree;
        let n = self.n_coefficients();
        if x >= self.knots[n] {
            return n - 1;
        }
        if x <= self.knots[k] {
            return k;
        }
        let (mut lo, mut hi) = (k, n);
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if x < self.knots[mid] {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        lo
    }

    /// Non-zero basis values at `x`.
    ///
    /// Returns the span `i`; `values[r]` belongs to basis function `i - k + r`.
    pub fn nonzero(&self, x: f64) -> (usize, Vec<f64>) {
        let k = self.degree;
        let i = self.span(x);
        let mut values = vec![0.0; k + 1];
        let mut left = vec![0.0; k + 1];
        let mut right = vec![0.0; k + 1];
        values[0] = 1.0;

        for j in 1..=k {
            left[j] = x - self.knots[i + 1 - j];
            right[j] = self.knots[i + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let temp = values[r] / (right[r + 1] + left[j - r]);
                values[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            values[j] = saved;
        }

        (i, values)
    }

    /// Collocation matrix: row `r` holds every basis function evaluated at `xs[r]`.
    pub fn design_matrix(&self, xs: &[f64]) -> DMatrix<f64> {
        let k = self.degree;
        let mut out = DMatrix::<f64>::zeros(xs.len(), self.n_coefficients());
        for (row, &x) in xs.iter().enumerate() {
            let (span, values) = self.nonzero(x);
            for (r, v) in values.into_iter().enumerate() {
                out[(row, span - k + r)] = v;
            }
        }
        out
    }

    /// Evaluate the spline `Σ c_j B_j(x)`.
    pub fn evaluate(&self, coefficients: &[f64], x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        let k = self.degree;
        let (span, values) = self.nonzero(x);
        values
            .iter()
            .enumerate()
            .map(|(r, v)| v * coefficients[span - k + r])
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficient_count_matches_point_count() {
        let xs: Vec<f64> = (0..9).map(f64::from).collect();
        for k in 1..=5 {
            let basis = BSplineBasis::interpolating(&xs, k);
            assert_eq!(basis.n_coefficients(), xs.len(), "degree {k}");
            assert_eq!(basis.domain(), (0.0, 8.0));
        }
    }

    #[test]
    fn basis_is_a_partition_of_unity() {
        let xs = [0.0, 0.5, 1.7, 2.0, 3.3, 4.0, 6.0];
        let basis = BSplineBasis::interpolating(&xs, 3);
        for &x in &[0.0, 0.2, 1.0, 2.5, 3.99, 6.0] {
            let (_, values) = basis.nonzero(x);
            let sum: f64 = values.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "sum at {x} was {sum}");
        }
    }

    #[test]
    fn unit_coefficients_extrapolate_to_one() {
        // Σ B_j = 1 on every polynomial piece, so continuing a boundary piece
        // with all-ones coefficients stays at 1.
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let basis = BSplineBasis::interpolating(&xs, 2);
        let ones = vec![1.0; basis.n_coefficients()];
        assert!((basis.evaluate(&ones, -2.0) - 1.0).abs() < 1e-12);
        assert!((basis.evaluate(&ones, 7.5) - 1.0).abs() < 1e-12);
    }
}
