//! Statistical kernel for the evidence collectors.
//!
//! Special functions (log-gamma, regularized incomplete beta and gamma) and
//! the tests built on them. Every test returns `None` when it is undefined
//! for the input, so callers can record the gene as having no evidence.

use std::f64::consts::PI;

use crate::normalise::average_ranks;

/// Smallest p-value reported by any test.
pub const P_FLOOR: f64 = 1e-300;

// ── Descriptive statistics ──────────────────────────────────────────────────

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Unbiased sample variance (n − 1 denominator).
pub fn variance(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return f64::NAN;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (xs.len() - 1) as f64
}

pub fn median(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    let mut v = xs.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    }
}

// ── Special functions ───────────────────────────────────────────────────────

/// Log-gamma via Lanczos approximation (g=7, n=9 coefficients).
#[allow(clippy::excessive_precision)]
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_93,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_13,
        -176.615_029_162_140_59,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_571_6e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection formula
        let lnpi_sin = (PI * x).sin().abs().ln();
        PI.ln() - lnpi_sin - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut ag = COEFFS[0];
        for (i, &c) in COEFFS[1..].iter().enumerate() {
            ag += c / (x + i as f64 + 1.0);
        }
        let t = x + 7.5;
        0.5f64.mul_add((2.0 * PI).ln(), (x + 0.5) * t.ln()) - t + ag.ln()
    }
}

fn ln_beta(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

/// Regularized incomplete beta I_x(a, b), Lentz continued fraction.
#[allow(clippy::many_single_char_names)]
pub fn regularized_ibeta(x: f64, a: f64, b: f64) -> f64 {
    const EPS: f64 = 1e-15;
    const TINY: f64 = 1e-300;
    const MAX_ITER: usize = 300;

    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    if x > (a + 1.0) / (a + b + 2.0) {
        return 1.0 - regularized_ibeta(1.0 - x, b, a);
    }

    let ln_prefactor = a.mul_add(x.ln(), b * (1.0 - x).ln()) - ln_beta(a, b) - a.ln();
    let prefactor = ln_prefactor.exp();

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0_f64;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m_f64 = m as f64;
        let m2 = 2.0 * m_f64;

        let aa = m_f64 * (b - m_f64) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -((a + m_f64) * (qab + m_f64) * x) / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPS {
            break;
        }
    }

    prefactor * h
}

/// Regularized lower incomplete gamma P(a, x).
pub fn regularized_gamma_p(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x < a + 1.0 {
        gamma_series(a, x)
    } else {
        1.0 - gamma_continued_fraction(a, x)
    }
}

/// Regularized upper incomplete gamma Q(a, x) = 1 − P(a, x).
pub fn regularized_gamma_q(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    if x < a + 1.0 {
        1.0 - gamma_series(a, x)
    } else {
        gamma_continued_fraction(a, x)
    }
}

fn gamma_series(a: f64, x: f64) -> f64 {
    const EPS: f64 = 1e-15;
    let mut ap = a;
    let mut sum = 1.0 / a;
    let mut del = sum;
    for _ in 0..1000 {
        ap += 1.0;
        del *= x / ap;
        sum += del;
        if del.abs() < sum.abs() * EPS {
            break;
        }
    }
    (sum.ln() - x + a * x.ln() - ln_gamma(a)).exp()
}

fn gamma_continued_fraction(a: f64, x: f64) -> f64 {
    const EPS: f64 = 1e-15;
    const TINY: f64 = 1e-300;
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..1000 {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < TINY {
            d = TINY;
        }
        c = b + an / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    ((-x + a * x.ln() - ln_gamma(a)).exp() * h).min(1.0)
}

// ── Distribution tails ──────────────────────────────────────────────────────

/// Two-sided p-value of a Student t statistic.
pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return if t.is_nan() { 1.0 } else { P_FLOOR };
    }
    let x = df / (df + t * t);
    regularized_ibeta(x, df / 2.0, 0.5).clamp(P_FLOOR, 1.0)
}

/// Two-sided p-value of a standard normal statistic, erfc(|z| / √2).
pub fn normal_two_sided(z: f64) -> f64 {
    if z.is_nan() {
        return 1.0;
    }
    regularized_gamma_q(0.5, z * z / 2.0).clamp(P_FLOOR, 1.0)
}

/// Upper tail of a chi-square distribution with `k` degrees of freedom.
pub fn chi2_sf(x: f64, k: f64) -> f64 {
    if x.is_nan() {
        return 1.0;
    }
    regularized_gamma_q(k / 2.0, x / 2.0).clamp(P_FLOOR, 1.0)
}

/// P(X ≥ k) for X ~ Binomial(n, p).
pub fn binomial_sf(k: u64, n: u64, p: f64) -> f64 {
    if k == 0 {
        return 1.0;
    }
    if k > n {
        return P_FLOOR;
    }
    regularized_ibeta(p, k as f64, (n - k + 1) as f64).clamp(P_FLOOR, 1.0)
}

/// P(X ≥ k) for X ~ Poisson(lambda).
pub fn poisson_sf(k: u64, lambda: f64) -> f64 {
    if k == 0 {
        return 1.0;
    }
    regularized_gamma_p(k as f64, lambda).clamp(P_FLOOR, 1.0)
}

// ── Two-sample tests ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub statistic: f64,
    pub df: f64,
    pub p_value: f64,
}

/// Welch's unequal-variance t-test. `None` when a group has fewer than two
/// values or both groups are constant.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Option<TTest> {
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (va, vb) = (variance(a), variance(b));
    if va == 0.0 && vb == 0.0 {
        return None;
    }
    let (sa, sb) = (va / na, vb / nb);
    let se = (sa + sb).sqrt();
    let t = (mean(a) - mean(b)) / se;
    let df = (sa + sb).powi(2) / (sa * sa / (na - 1.0) + sb * sb / (nb - 1.0));
    Some(TTest {
        statistic: t,
        df,
        p_value: student_t_two_sided(t, df),
    })
}

/// Student's pooled-variance t-test.
pub fn student_t_test(a: &[f64], b: &[f64]) -> Option<TTest> {
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (va, vb) = (variance(a), variance(b));
    if va == 0.0 && vb == 0.0 {
        return None;
    }
    let df = na + nb - 2.0;
    let pooled = ((na - 1.0) * va + (nb - 1.0) * vb) / df;
    let t = (mean(a) - mean(b)) / (pooled * (1.0 / na + 1.0 / nb)).sqrt();
    Some(TTest {
        statistic: t,
        df,
        p_value: student_t_two_sided(t, df),
    })
}

// ── Correlation ─────────────────────────────────────────────────────────────

/// Pearson correlation; `None` with fewer than three pairs or a constant side.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n != y.len() || n < 3 {
        return None;
    }
    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Spearman correlation: Pearson on average ranks.
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    pearson(&average_ranks(x), &average_ranks(y))
}

/// Two-sided p-value of a correlation coefficient over `n` pairs
/// (t = r·√((n−2)/(1−r²)), n − 2 degrees of freedom).
pub fn correlation_p_value(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= 0.0 {
        return P_FLOOR;
    }
    student_t_two_sided(r * (df / denom).sqrt(), df)
}

// ── Survival ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogRank {
    pub chi2: f64,
    pub p_value: f64,
    /// (O₁/E₁) / (O₀/E₀) with group 1 = `in_group` true.
    pub hazard_ratio: f64,
    pub observed_group: f64,
    pub expected_group: f64,
}

/// Two-group log-rank test. `None` without events or when a group is empty.
pub fn log_rank(times: &[f64], events: &[bool], in_group: &[bool]) -> Option<LogRank> {
    let n = times.len();
    if n == 0 || events.len() != n || in_group.len() != n {
        return None;
    }
    let n1_total = in_group.iter().filter(|g| **g).count();
    if n1_total == 0 || n1_total == n {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));

    let mut at_risk = n as f64;
    let mut at_risk1 = n1_total as f64;
    let (mut o1, mut e1, mut var, mut total_events) = (0.0, 0.0, 0.0, 0.0);

    let mut i = 0;
    while i < n {
        let t = times[order[i]];
        let mut j = i;
        let (mut d, mut d1, mut leaving, mut leaving1) = (0.0, 0.0, 0.0, 0.0);
        while j < n && times[order[j]] == t {
            let k = order[j];
            leaving += 1.0;
            if in_group[k] {
                leaving1 += 1.0;
            }
            if events[k] {
                d += 1.0;
                if in_group[k] {
                    d1 += 1.0;
                }
            }
            j += 1;
        }
        if d > 0.0 {
            let frac = at_risk1 / at_risk;
            o1 += d1;
            e1 += d * frac;
            if at_risk > 1.0 {
                var += d * frac * (1.0 - frac) * (at_risk - d) / (at_risk - 1.0);
            }
            total_events += d;
        }
        at_risk -= leaving;
        at_risk1 -= leaving1;
        i = j;
    }

    if total_events == 0.0 || var <= 0.0 {
        return None;
    }
    let chi2 = (o1 - e1).powi(2) / var;
    let (o0, e0) = (total_events - o1, total_events - e1);
    let hazard_ratio = if o1 == 0.0 || o0 == 0.0 {
        ((o1 + 0.5) / (e1 + 0.5)) / ((o0 + 0.5) / (e0 + 0.5))
    } else {
        (o1 / e1) / (o0 / e0)
    };
    Some(LogRank {
        chi2,
        p_value: chi2_sf(chi2, 1.0),
        hazard_ratio,
        observed_group: o1,
        expected_group: e1,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoxFit {
    /// Log hazard ratio per unit of the covariate.
    pub beta: f64,
    pub std_error: f64,
    pub z: f64,
    pub p_value: f64,
    pub iterations: usize,
    /// False when the partial likelihood has no finite maximum (separation).
    /// `beta` is then capped and `z`, `std_error` and `p_value` come from the
    /// score test at beta = 0.
    pub converged: bool,
}

/// Univariate Cox proportional hazards fit, Breslow ties, Newton–Raphson.
/// `None` without events, with a constant covariate, or on a non-finite
/// score or information.
pub fn cox_univariate(times: &[f64], events: &[bool], x: &[f64]) -> Option<CoxFit> {
    const MAX_ITER: usize = 30;
    const TOL: f64 = 1e-9;
    const MAX_STEP: f64 = 5.0;
    // Log hazard ratio past which the fit is treated as diverging
    const MAX_BETA: f64 = 20.0;

    let n = times.len();
    if n < 2 || events.len() != n || x.len() != n || !events.iter().any(|e| *e) {
        return None;
    }
    if variance(x) <= 0.0 {
        return None;
    }

    // Descending time so risk sets accumulate as we walk.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| times[b].total_cmp(&times[a]));

    let score_and_info = |beta: f64| -> (f64, f64) {
        let (mut s0, mut s1, mut s2) = (0.0, 0.0, 0.0);
        let (mut u, mut info) = (0.0, 0.0);
        let mut i = 0;
        while i < n {
            let t = times[order[i]];
            let mut j = i;
            let (mut d, mut xsum) = (0.0, 0.0);
            while j < n && times[order[j]] == t {
                let k = order[j];
                let w = (beta * x[k]).exp();
                s0 += w;
                s1 += w * x[k];
                s2 += w * x[k] * x[k];
                if events[k] {
                    d += 1.0;
                    xsum += x[k];
                }
                j += 1;
            }
            if d > 0.0 {
                let m1 = s1 / s0;
                u += xsum - d * m1;
                info += d * (s2 / s0 - m1 * m1);
            }
            i = j;
        }
        (u, info)
    };

    let (u0, info0) = score_and_info(0.0);
    if !(info0 > 0.0) || !u0.is_finite() {
        return None;
    }

    let mut beta = 0.0;
    let mut iterations = 0;
    let mut info = info0;
    let mut converged = false;
    for it in 1..=MAX_ITER {
        let (u, i_beta) = score_and_info(beta);
        iterations = it;
        if !(i_beta > 0.0) || !u.is_finite() {
            break;
        }
        info = i_beta;
        let step = (u / info).clamp(-MAX_STEP, MAX_STEP);
        beta += step;
        if step.abs() < TOL {
            converged = true;
            break;
        }
        if beta.abs() > MAX_BETA {
            break;
        }
    }
    if !converged {
        let std_error = 1.0 / info0.sqrt();
        let z = u0 * std_error;
        return Some(CoxFit {
            beta: MAX_BETA.copysign(u0),
            std_error,
            z,
            p_value: normal_two_sided(z),
            iterations,
            converged,
        });
    }
    let (_, final_info) = score_and_info(beta);
    if final_info > 0.0 {
        info = final_info;
    }
    if !beta.is_finite() || !(info > 0.0) {
        return None;
    }
    let std_error = 1.0 / info.sqrt();
    let z = beta / std_error;
    Some(CoxFit {
        beta,
        std_error,
        z,
        p_value: normal_two_sided(z),
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_ln_gamma_known_values() {
        assert!(close(ln_gamma(1.0), 0.0, 1e-12));
        assert!(close(ln_gamma(5.0), 24f64.ln(), 1e-10));
        assert!(close(ln_gamma(0.5), PI.sqrt().ln(), 1e-10));
    }

    #[test]
    fn test_student_t_reference_values() {
        // t = 2.0, df = 10 → two-sided p ≈ 0.07339
        assert!(close(student_t_two_sided(2.0, 10.0), 0.073388, 1e-5));
        assert!(close(student_t_two_sided(0.0, 5.0), 1.0, 1e-12));
    }

    #[test]
    fn test_normal_and_chi2_tails() {
        assert!(close(normal_two_sided(1.959964), 0.05, 1e-6));
        assert!(close(chi2_sf(3.841459, 1.0), 0.05, 1e-6));
        assert!(close(regularized_gamma_p(2.0, 0.0), 0.0, 1e-15));
    }

    #[test]
    fn test_binomial_and_poisson_tails() {
        // P(X ≥ 1), n = 10, p = 0.1 → 1 − 0.9^10
        assert!(close(binomial_sf(1, 10, 0.1), 1.0 - 0.9f64.powi(10), 1e-12));
        assert_eq!(binomial_sf(0, 10, 0.1), 1.0);
        // P(X ≥ 1), λ = 2 → 1 − e^{-2}
        assert!(close(poisson_sf(1, 2.0), 1.0 - (-2f64).exp(), 1e-12));
        // Recurrent mutation is very unlikely under a 1% background
        assert!(binomial_sf(8, 20, 0.01) < 1e-10);
    }

    #[test]
    fn test_welch_vs_student() {
        let a = [5.1, 4.9, 5.6, 5.8, 6.0, 5.5];
        let b = [3.2, 3.9, 4.1, 3.5, 3.0, 3.8];
        let w = welch_t_test(&a, &b).unwrap();
        let s = student_t_test(&a, &b).unwrap();
        assert!(w.statistic > 0.0);
        assert!(w.p_value < 1e-4);
        assert!(close(s.df, 10.0, 1e-12));
        assert!(w.df <= 10.0);
    }

    #[test]
    fn test_constant_groups_have_no_test() {
        assert!(welch_t_test(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0]).is_none());
        assert!(welch_t_test(&[1.0], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn test_correlations() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.1, 6.2, 7.9, 10.1];
        assert!(pearson(&x, &y).unwrap() > 0.99);
        let cubic: Vec<f64> = x.iter().map(|v| v * v * v).collect();
        assert!(close(spearman(&x, &cubic).unwrap(), 1.0, 1e-12));
        assert!(pearson(&x, &[1.0; 5]).is_none());
        assert!(correlation_p_value(0.99, 5) < 0.01);
        assert_eq!(correlation_p_value(1.0, 5), P_FLOOR);
    }

    #[test]
    fn test_log_rank_detects_separation() {
        // Group 1 dies early, group 0 survives long
        let times = [1.0, 2.0, 3.0, 4.0, 5.0, 20.0, 21.0, 22.0, 23.0, 24.0];
        let events = [true; 10];
        let group = [true, true, true, true, true, false, false, false, false, false];
        let lr = log_rank(&times, &events, &group).unwrap();
        assert!(lr.p_value < 0.01, "p = {}", lr.p_value);
        assert!(lr.hazard_ratio > 1.0);
        assert!(log_rank(&times, &[false; 10], &group).is_none());
    }

    #[test]
    fn test_cox_sign_follows_hazard() {
        // Higher covariate → earlier death, with some inversions so the
        // partial likelihood has a finite maximum
        let x: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let times = vec![90.0, 95.0, 70.0, 80.0, 60.0, 85.0, 40.0, 55.0, 30.0, 50.0, 20.0, 25.0];
        let mut events = vec![true; 12];
        events[0] = false;
        let fit = cox_univariate(&times, &events, &x).unwrap();
        assert!(fit.converged);
        assert!(fit.beta > 0.0);
        assert!(fit.std_error > 0.0);
        assert!(cox_univariate(&times, &events, &[3.0; 12]).is_none());
    }

    #[test]
    fn test_cox_separation_uses_score_test() {
        // Every death ordered by covariate: the likelihood increases without bound
        let times: Vec<f64> = (1..=10).map(f64::from).collect();
        let x: Vec<f64> = (1..=10).rev().map(f64::from).collect();
        let fit = cox_univariate(&times, &[true; 10], &x).unwrap();
        assert!(!fit.converged);
        assert_eq!(fit.beta, 20.0);
        // U(0) = 22.5, I(0) = 31.25
        assert!(close(fit.z, 22.5 / 31.25f64.sqrt(), 1e-9));
        assert!(fit.p_value < 1e-3, "p = {}", fit.p_value);

        let reversed: Vec<f64> = x.iter().map(|v| -v).collect();
        let fit = cox_univariate(&times, &[true; 10], &reversed).unwrap();
        assert_eq!(fit.beta, -20.0);
        assert!(fit.p_value < 1e-3);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert!(median(&[]).is_nan());
    }
}
