//! Small statistics helpers: distribution quantiles and the two
//! validation metrics.

use std::f64::consts::PI;

/// Lower-tail quantile of the standard normal distribution.
///
/// Acklam's rational approximation; relative error below `1.2e-9` on
/// `(0, 1)`. Returns NaN outside the open unit interval.
#[must_use]
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    if p.is_nan() || p <= 0.0 || p >= 1.0 {
        return f64::NAN;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

/// Critical value `t` such that `P(|T| > t) = alpha` for a Student-t
/// variable with `df` degrees of freedom.
///
/// Hill's algorithm 396 (CACM 1970), exact for `df` 1 and 2. Returns NaN
/// for `alpha` outside `(0, 1)` or `df < 1`.
#[must_use]
pub fn student_t_critical(alpha: f64, df: f64) -> f64 {
    if alpha.is_nan() || alpha <= 0.0 || alpha >= 1.0 || df.is_nan() || df < 1.0 {
        return f64::NAN;
    }

    let n = df;
    if (n - 1.0).abs() < f64::EPSILON {
        let half = alpha * PI / 2.0;
        return half.cos() / half.sin();
    }
    if (n - 2.0).abs() < f64::EPSILON {
        return (2.0 / (alpha * (2.0 - alpha)) - 2.0).sqrt();
    }

    let a = 1.0 / (n - 0.5);
    let b = 48.0 / (a * a);
    let mut c = ((20_700.0 * a / b - 98.0) * a - 16.0) * a + 96.36;
    let d = ((94.5 / (b + c) - 3.0) / b + 1.0) * (a * PI / 2.0).sqrt() * n;
    let x = d * alpha;
    let mut y = x.powf(2.0 / n);

    if y > 0.05 + a {
        let x = normal_quantile(0.5 * alpha);
        y = x * x;
        if n < 5.0 {
            c += 0.3 * (n - 4.5) * (x + 0.6);
        }
        c = (((0.05 * d * x - 5.0) * x - 7.0) * x - 2.0) * x + b + c;
        y = (((((0.4 * y + 6.3) * y + 36.0) * y + 94.5) / c - y - 3.0) / b + 1.0) * x;
        y = a * y * y;
        y = if y > 0.002 {
            y.exp() - 1.0
        } else {
            0.5 * y * y + y
        };
    } else {
        y = ((1.0 / (((n + 6.0) / (n * y) - 0.089 * d - 0.822) * (n + 2.0) * 3.0)
            + 0.5 / (n + 4.0))
            * y
            - 1.0)
            * (n + 1.0)
            / (n + 2.0)
            + 1.0 / y;
    }

    (n * y).sqrt()
}

/// Mean of `|a - p| / max(a, p)` over paired values.
///
/// NaN when the slices are empty or any pair has `max(a, p) == 0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_relative_error(actual: &[i64], predicted: &[i64]) -> f64 {
    let n = actual.len().min(predicted.len());
    if n == 0 {
        return f64::NAN;
    }

    let mut total = 0.0;
    for (&a, &p) in actual.iter().zip(predicted) {
        let denominator = a.max(p);
        if denominator == 0 {
            return f64::NAN;
        }
        total += a.abs_diff(p) as f64 / denominator as f64;
    }

    total / n as f64
}

/// Pearson correlation coefficient of paired values.
///
/// NaN with fewer than two pairs or when either side has zero variance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pearson_correlation(x: &[i64], y: &[i64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }

    let xs: Vec<f64> = x[..n].iter().map(|&v| v as f64).collect();
    let ys: Vec<f64> = y[..n].iter().map(|&v| v as f64).collect();
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in xs.iter().zip(&ys) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }

    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_quantile_matches_tables() {
        assert!((normal_quantile(0.975) - 1.959_964).abs() < 1e-6);
        assert!((normal_quantile(0.5)).abs() < 1e-12);
        assert!((normal_quantile(0.01) + 2.326_348).abs() < 1e-6);
        assert!(normal_quantile(0.0).is_nan());
        assert!(normal_quantile(1.0).is_nan());
    }

    #[test]
    fn student_t_matches_tables() {
        let cases = [
            (0.05, 1.0, 12.706_2),
            (0.05, 2.0, 4.302_7),
            (0.05, 3.0, 3.182_4),
            (0.05, 10.0, 2.228_1),
            (0.05, 30.0, 2.042_3),
            (0.01, 10.0, 3.169_3),
            (0.01, 100.0, 2.625_9),
        ];
        for (alpha, df, expected) in cases {
            let t = student_t_critical(alpha, df);
            assert!((t - expected).abs() < 1e-3, "t({alpha}, {df}) = {t}");
        }
    }

    #[test]
    fn student_t_approaches_normal() {
        let t = student_t_critical(0.05, 100_000.0);
        assert!((t - 1.959_964).abs() < 1e-4);
    }

    #[test]
    fn student_t_rejects_bad_inputs() {
        assert!(student_t_critical(0.0, 10.0).is_nan());
        assert!(student_t_critical(0.05, 0.5).is_nan());
        assert!(student_t_critical(f64::NAN, 10.0).is_nan());
    }

    #[test]
    fn relative_error_uses_larger_value() {
        let err = mean_relative_error(&[100, 200], &[80, 250]);
        // 20/100 and 50/250.
        assert!((err - 0.2).abs() < 1e-12);
    }

    #[test]
    fn relative_error_is_undefined_for_double_zero() {
        assert!(mean_relative_error(&[100, 0], &[100, 0]).is_nan());
        assert!(mean_relative_error(&[], &[]).is_nan());
    }

    #[test]
    fn correlation_of_linear_data_is_one() {
        let x = [1, 2, 3, 4, 5];
        let y = [10, 20, 30, 40, 50];
        assert!((pearson_correlation(&x, &y) - 1.0).abs() < 1e-12);
        let inverse = [50, 40, 30, 20, 10];
        assert!((pearson_correlation(&x, &inverse) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_is_undefined_without_variance() {
        assert!(pearson_correlation(&[1, 2, 3], &[7, 7, 7]).is_nan());
        assert!(pearson_correlation(&[1], &[1]).is_nan());
    }
}
