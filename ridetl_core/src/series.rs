//! Column helpers that operate on plain `f64` slices. NaN is used to mark a
//! missing value, as it is throughout the derived fields.

/// Returns the difference between each value and its predecessor. The first
/// element has no predecessor and gets `first`.
pub fn diff(values: &[f64], first: f64) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());
    for (idx, v) in values.iter().enumerate() {
        if idx == 0 {
            result.push(first);
        } else {
            result.push(v - values[idx - 1]);
        }
    }
    result
}

/// Running total that skips missing values. A missing input stays missing in
/// the output, but does not stop the total from carrying on past it.
pub fn cumulative_sum(values: &[f64]) -> Vec<f64> {
    let mut total = 0.0;
    values
        .iter()
        .map(|v| {
            if v.is_nan() {
                f64::NAN
            } else {
                total += v;
                total
            }
        })
        .collect()
}

/// Fills missing values by linear interpolation between the nearest present
/// values either side, spacing by position. Missing values after the last
/// present value take that value; missing values before the first present
/// value are left alone.
pub fn interpolate_gaps(values: &mut [f64]) {
    let mut prev: Option<usize> = None;
    let mut idx = 0;

    while idx < values.len() {
        if !values[idx].is_nan() {
            prev = Some(idx);
            idx += 1;
            continue;
        }

        // Find the end of this run of missing values.
        let gap_start = idx;
        while idx < values.len() && values[idx].is_nan() {
            idx += 1;
        }

        let Some(left) = prev else {
            continue;
        };

        let left_value = values[left];
        if idx == values.len() {
            for v in &mut values[gap_start..] {
                *v = left_value;
            }
        } else {
            let right_value = values[idx];
            let span = (idx - left) as f64;
            for pos in gap_start..idx {
                let fraction = (pos - left) as f64 / span;
                values[pos] = lerp(left_value, right_value, fraction);
            }
        }
    }
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f64, b: f64, fraction: f64) -> f64 {
    a + (b - a) * fraction
}
