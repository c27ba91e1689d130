//! Two-sample statistical tests used by the data-drift evaluator

/// Two-sample Kolmogorov-Smirnov statistic: the maximum vertical distance
/// between the two empirical CDFs.
pub fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut xs = a.to_vec();
    let mut ys = b.to_vec();
    xs.sort_by(|p, q| p.partial_cmp(q).unwrap_or(std::cmp::Ordering::Equal));
    ys.sort_by(|p, q| p.partial_cmp(q).unwrap_or(std::cmp::Ordering::Equal));

    let (n1, n2) = (xs.len(), ys.len());
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;
    while i < n1 && j < n2 {
        let x = xs[i];
        let y = ys[j];
        let v = x.min(y);
        while i < n1 && xs[i] <= v {
            i += 1;
        }
        while j < n2 && ys[j] <= v {
            j += 1;
        }
        let f1 = i as f64 / n1 as f64;
        let f2 = j as f64 / n2 as f64;
        d = d.max((f1 - f2).abs());
    }
    d
}

/// Asymptotic p-value for the two-sample KS statistic.
///
/// Uses the Kolmogorov distribution series with the small-sample
/// correction from Numerical Recipes.
pub fn ks_p_value(d: f64, n1: usize, n2: usize) -> f64 {
    if n1 == 0 || n2 == 0 {
        return 1.0;
    }
    let en = ((n1 * n2) as f64 / (n1 + n2) as f64).sqrt();
    let lambda = (en + 0.12 + 0.11 / en) * d;

    let mut sum = 0.0;
    let mut sign = 1.0;
    let mut prev_mag = 0.0;
    for k in 1..=100 {
        let term = sign * (-2.0 * (k as f64).powi(2) * lambda * lambda).exp();
        sum += term;
        let mag = term.abs();
        if mag <= 1e-12 || (prev_mag > 0.0 && mag <= 0.001 * prev_mag) {
            return (2.0 * sum).clamp(0.0, 1.0);
        }
        prev_mag = mag;
        sign = -sign;
    }
    // Series failed to converge, which only happens for a vanishing
    // statistic: no evidence against the null
    1.0
}

/// Chi-square test on a binary (one-hot) feature.
///
/// Builds the 2x2 contingency of zero/non-zero counts across the two
/// samples and returns `(chi2, p)` with one degree of freedom.
pub fn chi_square_binary(a: &[f64], b: &[f64]) -> (f64, f64) {
    if a.is_empty() || b.is_empty() {
        return (0.0, 1.0);
    }
    let ones_a = a.iter().filter(|&&v| v != 0.0).count() as f64;
    let ones_b = b.iter().filter(|&&v| v != 0.0).count() as f64;
    let n_a = a.len() as f64;
    let n_b = b.len() as f64;
    let total = n_a + n_b;
    let pooled = (ones_a + ones_b) / total;

    // Degenerate pooled proportion means both samples agree exactly
    if pooled <= 0.0 || pooled >= 1.0 {
        return (0.0, 1.0);
    }

    let observed = [
        (ones_a, n_a * pooled),
        (n_a - ones_a, n_a * (1.0 - pooled)),
        (ones_b, n_b * pooled),
        (n_b - ones_b, n_b * (1.0 - pooled)),
    ];
    let chi2: f64 = observed
        .iter()
        .map(|(o, e)| (o - e).powi(2) / e)
        .sum();

    // df = 1: the chi-square tail equals the two-sided normal tail of
    // z = sqrt(chi2)
    (chi2, normal_tail_p(chi2.sqrt()))
}

/// Two-tailed normal tail probability via the Abramowitz-Stegun
/// polynomial approximation.
pub fn normal_tail_p(z: f64) -> f64 {
    let z = z.abs();
    let t = 1.0 / (1.0 + 0.2316419 * z);
    let d = 0.3989423 * (-z * z / 2.0).exp();
    let p = d * t
        * (0.3193815 + t * (-0.3565638 + t * (1.781478 + t * (-1.821256 + t * 1.330274))));
    (2.0 * p).clamp(0.0, 1.0)
}
