/// Upper bound on points handed to the renderer per series and frame.
pub const MAX_POINTS_PER_SERIES: usize = 5000;

/// Largest-Triangle-Three-Buckets (LTTB) downsampling of `[x, y]` points.
pub fn lttb_downsample(points: &[[f64; 2]], target: usize) -> Vec<[f64; 2]> {
    let n = points.len();
    if n <= target || target < 3 {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity(target);
    out.push(points[0]);

    let bucket_size = (n - 2) as f64 / (target - 2) as f64;
    let mut prev = points[0];

    for i in 0..(target - 2) {
        let bucket_start = (i as f64 * bucket_size) as usize + 1;
        let bucket_end = (((i + 1) as f64 * bucket_size) as usize + 1).min(n - 1);

        // Average of the following bucket is the third triangle corner.
        let next_start = bucket_end;
        let next_end = (((i + 2) as f64 * bucket_size) as usize + 1).min(n);
        let next = &points[next_start..next_end.max(next_start + 1).min(n)];
        let count = next.len().max(1) as f64;
        let avg_x = next.iter().map(|p| p[0]).sum::<f64>() / count;
        let avg_y = next.iter().map(|p| p[1]).sum::<f64>() / count;

        let mut best = points[bucket_start];
        let mut max_area = -1.0f64;
        for &p in &points[bucket_start..bucket_end.max(bucket_start + 1)] {
            // Doubled area; only compared.
            let area = ((prev[0] - avg_x) * (p[1] - prev[1]) - (prev[0] - p[0]) * (avg_y - prev[1])).abs();
            if area > max_area {
                max_area = area;
                best = p;
            }
        }

        out.push(best);
        prev = best;
    }

    out.push(points[n - 1]);
    out
}

/// Points of one series inside `[view_min, view_max]` on X, ready to draw.
///
/// Slots with a NaN coordinate are skipped. One point beyond each edge is kept
/// for sorted data so lines run to the border.
pub fn decimate_for_view(
    x: &[f64],
    y: &[f64],
    view_min: f64,
    view_max: f64,
    max_points: usize,
) -> Vec<[f64; 2]> {
    let finite = |&(&xv, &yv): &(&f64, &f64)| !xv.is_nan() && !yv.is_nan();

    let is_sorted = x.windows(2).all(|w| !(w[1] < w[0]));
    let visible: Vec<[f64; 2]> = if is_sorted {
        let start = x.partition_point(|&v| v < view_min).saturating_sub(1);
        let end = (x.partition_point(|&v| v <= view_max) + 1).min(x.len());
        x[start..end]
            .iter()
            .zip(&y[start..end.min(y.len())])
            .filter(finite)
            .map(|(&xv, &yv)| [xv, yv])
            .collect()
    } else {
        x.iter()
            .zip(y)
            .filter(finite)
            .filter(|&(&xv, _)| xv >= view_min && xv <= view_max)
            .map(|(&xv, &yv)| [xv, yv])
            .collect()
    };

    lttb_downsample(&visible, max_points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_input_is_untouched() {
        let pts = vec![[0.0, 1.0], [1.0, 2.0]];
        assert_eq!(lttb_downsample(&pts, 10), pts);
    }

    #[test]
    fn lttb_keeps_endpoints_and_target_size() {
        let pts: Vec<[f64; 2]> = (0..1000).map(|i| [i as f64, (i as f64 * 0.1).sin()]).collect();
        let out = lttb_downsample(&pts, 100);
        assert_eq!(out.len(), 100);
        assert_eq!(out[0], pts[0]);
        assert_eq!(out[99], pts[999]);
        assert!(out.windows(2).all(|w| w[0][0] < w[1][0]));
    }

    #[test]
    fn lttb_keeps_a_spike() {
        let mut pts: Vec<[f64; 2]> = (0..500).map(|i| [i as f64, 0.0]).collect();
        pts[250][1] = 100.0;
        let out = lttb_downsample(&pts, 50);
        assert!(out.iter().any(|p| p[1] == 100.0));
    }

    #[test]
    fn view_skips_nan_and_clips_to_range() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [0.0, f64::NAN, 2.0, 3.0, 4.0, 5.0];
        let out = decimate_for_view(&x, &y, 2.0, 3.0, 100);
        assert_eq!(out, vec![[2.0, 2.0], [3.0, 3.0], [4.0, 4.0]]);
    }

    #[test]
    fn unsorted_data_is_filtered_linearly() {
        let x = [5.0, 1.0, 3.0, 9.0];
        let y = [1.0, 2.0, 3.0, 4.0];
        let out = decimate_for_view(&x, &y, 2.0, 6.0, 100);
        assert_eq!(out, vec![[5.0, 1.0], [3.0, 3.0]]);
    }
}
