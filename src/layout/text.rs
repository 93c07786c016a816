use log::warn;

use crate::text_metrics;

/// Rendered width of a single-line label.
pub(crate) fn label_width(text: &str, font_size: f32, font_family: &str) -> f32 {
    if text.is_empty() || font_size <= 0.0 {
        return 0.0;
    }
    match text_metrics::measure_text_width(text, font_size, font_family) {
        Some(width) => width,
        None => {
            warn!("no font resolved for `{font_family}`, estimating label width");
            estimated_width(text, font_size)
        }
    }
}

/// Width estimate from average glyph proportions of common sans-serif faces.
pub(crate) fn estimated_width(text: &str, font_size: f32) -> f32 {
    text.chars()
        .filter(|ch| *ch != '\n')
        .map(char_width_factor)
        .sum::<f32>()
        * font_size
}

pub(crate) fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.306,
        '.' | ',' | ':' | ';' | '|' | '!' | '\'' => 0.278,
        '(' | ')' | '[' | ']' | '{' | '}' | '\\' | '/' => 0.321,
        'i' | 'j' | 'l' | 'I' => 0.24,
        'f' | 't' | 'r' => 0.34,
        'm' | 'w' => 0.84,
        'M' | 'W' => 0.93,
        '@' | '#' | '%' | '&' => 0.946,
        '0'..='9' => 0.6,
        'A'..='Z' => 0.68,
        'a'..='z' => 0.56,
        ch if ch.is_whitespace() => 0.306,
        ch if !ch.is_ascii() => 1.0,
        _ => 0.568,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_width() {
        assert_eq!(label_width("", 12.0, "sans-serif"), 0.0);
        assert_eq!(label_width("abc", 0.0, "sans-serif"), 0.0);
    }

    #[test]
    fn estimate_scales_with_font_size() {
        let small = estimated_width("Label", 10.0);
        let large = estimated_width("Label", 20.0);
        assert!((large - 2.0 * small).abs() < 1e-4);
        assert!(estimated_width("mmm", 10.0) > estimated_width("iii", 10.0));
    }
}
