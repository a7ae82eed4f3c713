pub mod today;
pub mod week;

use ansi_term::{Colour, Style};

use crate::utils::percentage::Percentage;

/// Width of the bars drawn next to domains.
const BAR_WIDTH: usize = 30;

/// Formats seconds the way people read time spent: `1h 5m`, `12m` or `40s`.
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{seconds}s")
    }
}

/// Horizontal bar filled proportionally to `share`.
pub fn bar(share: Percentage) -> String {
    let filled = ((*share / 100.).clamp(0., 1.) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Terminal style for a heatmap level between 0 and [week::MAX_INTENSITY].
pub fn intensity_style(level: u8) -> Style {
    match level {
        0 => Style::new().dimmed(),
        1 => Colour::Fixed(22).normal(),
        2 => Colour::Fixed(28).normal(),
        3 => Colour::Fixed(34).normal(),
        4 => Colour::Fixed(40).bold(),
        _ => Colour::Fixed(46).bold(),
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::percentage::Percentage;

    use super::{bar, format_time};

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0s");
        assert_eq!(format_time(59), "59s");
        assert_eq!(format_time(60), "1m");
        assert_eq!(format_time(3599), "59m");
        assert_eq!(format_time(5400), "1h 30m");
        assert_eq!(format_time(7205), "2h 0m");
    }

    #[test]
    fn test_bar_is_clamped() {
        let full = bar(Percentage::new_opt(250.).unwrap());
        assert_eq!(full.chars().filter(|c| *c == '█').count(), 30);
        let half = bar(Percentage::new_opt(50.).unwrap());
        assert_eq!(half.chars().filter(|c| *c == '█').count(), 15);
        assert_eq!(half.chars().count(), 30);
    }
}
