//! Student t distribution quantiles.
//!
//! The CDF is expressed through the regularized incomplete beta function,
//! evaluated with a Lentz continued fraction, and inverted by bisection on
//! the upper tail. Accurate to well below 1e-9 for the degrees of freedom
//! seen in repeated-trial benchmarks.

const LANCZOS_G: f64 = 7.0;
const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

const CF_MAX_ITER: usize = 300;
const CF_EPS: f64 = 1e-15;
const FP_MIN: f64 = 1e-300;
const BISECT_ITER: usize = 200;

/// `ln Γ(x)` for `x > 0`.
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection: Γ(x)Γ(1-x) = π / sin(πx)
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    let mut a = LANCZOS[0];
    for (i, c) in LANCZOS.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + a.ln()
}

fn beta_cf(a: f64, b: f64, x: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = clamp_tiny(1.0 - qab * x / qap).recip();
    let mut h = d;

    for m in 1..=CF_MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = clamp_tiny(1.0 + aa * d).recip();
        c = clamp_tiny(1.0 + aa / c);
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = clamp_tiny(1.0 + aa * d).recip();
        c = clamp_tiny(1.0 + aa / c);
        let del = d * c;
        h *= del;

        if (del - 1.0).abs() < CF_EPS {
            break;
        }
    }
    h
}

fn clamp_tiny(v: f64) -> f64 {
    if v.abs() < FP_MIN {
        FP_MIN
    } else {
        v
    }
}

/// Regularized incomplete beta `I_x(a, b)`.
pub fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_cf(a, b, x) / a
    } else {
        1.0 - front * beta_cf(b, a, 1.0 - x) / b
    }
}

/// `P(T > t)` for `t >= 0`.
fn upper_tail(t: f64, df: f64) -> f64 {
    0.5 * incomplete_beta(df / 2.0, 0.5, df / (df + t * t))
}

/// CDF of the t distribution with `df` degrees of freedom.
pub fn cdf(t: f64, df: f64) -> f64 {
    if t >= 0.0 {
        1.0 - upper_tail(t, df)
    } else {
        upper_tail(-t, df)
    }
}

/// Inverse CDF. `None` unless `0 < p < 1` and `df` is positive and finite.
pub fn quantile(p: f64, df: f64) -> Option<f64> {
    if !(p > 0.0 && p < 1.0) || !(df > 0.0 && df.is_finite()) {
        return None;
    }
    if p == 0.5 {
        return Some(0.0);
    }
    if p < 0.5 {
        return quantile(1.0 - p, df).map(|t| -t);
    }

    let tail = 1.0 - p;
    let mut lo = 0.0;
    let mut hi = 1.0;
    while upper_tail(hi, df) > tail {
        lo = hi;
        hi *= 2.0;
        if !hi.is_finite() {
            return None;
        }
    }
    for _ in 0..BISECT_ITER {
        let mid = 0.5 * (lo + hi);
        if upper_tail(mid, df) > tail {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= 1e-14 * hi.max(1.0) {
            break;
        }
    }
    Some(0.5 * (lo + hi))
}

/// Critical value `t` such that `P(|T| <= t) = confidence`.
pub fn two_tailed_critical(confidence: f64, df: f64) -> Option<f64> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return None;
    }
    quantile((1.0 + confidence) / 2.0, df)
}
