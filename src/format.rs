pub const UNAVAILABLE: &str = "N/A";

pub fn pct(value: Option<f64>) -> String {
    with_unit(value, 1, "%")
}

pub fn celsius(value: Option<f64>) -> String {
    with_unit(value, 1, "°C")
}

pub fn gigabytes(value: Option<f64>) -> String {
    with_unit(value, 2, " GB")
}

pub fn mb_per_sec(value: Option<f64>) -> String {
    with_unit(value, 2, " MB/s")
}

/// `"used / total MB"`, rounded to whole megabytes.
pub fn megabyte_ratio(used: Option<f64>, total: Option<f64>) -> String {
    match (used, total) {
        (Some(used), Some(total)) => format!("{used:.0} / {total:.0} MB"),
        _ => UNAVAILABLE.to_string(),
    }
}

fn with_unit(value: Option<f64>, precision: usize, unit: &str) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.precision$}{unit}"),
        _ => UNAVAILABLE.to_string(),
    }
}

/// One block glyph per sample, scaled against `ceiling` (or the window max when `None`).
pub fn sparkline(values: &[f64], ceiling: Option<f64>) -> String {
    const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

    let top = ceiling.unwrap_or_else(|| values.iter().copied().fold(0.0, f64::max));
    if top <= 0.0 {
        return BARS[0].to_string().repeat(values.len());
    }
    values
        .iter()
        .map(|v| {
            let ratio = (v / top).clamp(0.0, 1.0);
            BARS[((ratio * (BARS.len() - 1) as f64).round()) as usize]
        })
        .collect()
}
