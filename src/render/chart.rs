/// Minimum chart scale in minutes, so an empty week still draws a sensible
/// axis and the proportion never divides by zero.
pub const WEEK_SCALE_FLOOR_MINUTES: i64 = 10;

pub fn week_scale(values: &[i64]) -> i64 {
    values
        .iter()
        .copied()
        .max()
        .unwrap_or(0)
        .max(WEEK_SCALE_FLOOR_MINUTES)
}

/// A `width`-cell bar filled proportionally to `value / scale`.
pub fn bar(value: i64, scale: i64, width: usize) -> String {
    let scale = scale.max(1);
    let filled = (value.clamp(0, scale) * width as i64 / scale) as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// The goal meter: a [bar] over a 0-100 percentage.
pub fn meter(percent: u32, width: usize) -> String {
    bar(percent.min(100) as i64, 100, width)
}

#[cfg(test)]
mod tests {
    use super::{bar, meter, week_scale};

    #[test]
    fn test_week_scale_floor() {
        assert_eq!(week_scale(&[]), 10);
        assert_eq!(week_scale(&[0, 0, 3]), 10);
        assert_eq!(week_scale(&[0, 45, 3]), 45);
    }

    #[test]
    fn test_bar_proportions() {
        assert_eq!(bar(0, 10, 4), "░░░░");
        assert_eq!(bar(5, 10, 4), "██░░");
        assert_eq!(bar(10, 10, 4), "████");
        // values past the scale stay clamped to a full bar
        assert_eq!(bar(25, 10, 4), "████");
    }

    #[test]
    fn test_meter_is_percent_scaled() {
        assert_eq!(meter(50, 10), "█████░░░░░");
        assert_eq!(meter(130, 10), "██████████");
    }
}
