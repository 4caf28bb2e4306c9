//! Scroll transition of the model's mount element.
//!
//! Once the page is scrolled past the hero section the mount element slides
//! down, reaching its full offset when the about section's top is reached.

/// How far the viewport has travelled from the bottom of the hero section to
/// the top of the about section, in `[0, 1]`.
///
/// Callers must keep `hero_height` and `about_offset_top` apart: when they are
/// equal the division yields infinity or NaN.
pub fn scroll_progress(scroll_y: f64, hero_height: f64, about_offset_top: f64) -> f64 {
    if scroll_y > hero_height {
        ((scroll_y - hero_height) / (about_offset_top - hero_height)).min(1.0)
    } else {
        0.0
    }
}

/// Vertical offset in pixels for a given scroll position.
pub fn scroll_offset(scroll_y: f64, hero_height: f64, about_offset_top: f64, max_offset_px: f64) -> f64 {
    scroll_progress(scroll_y, hero_height, about_offset_top) * max_offset_px
}

/// CSS `transform` value for the mount element.
pub fn transform_css(scroll_y: f64, hero_height: f64, about_offset_top: f64, max_offset_px: f64) -> String {
    if scroll_y > hero_height {
        let offset = scroll_offset(scroll_y, hero_height, about_offset_top, max_offset_px);
        format!("translateY({offset}px)")
    } else {
        "translateY(0)".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HERO: f64 = 800.0;
    const ABOUT: f64 = 1200.0;

    #[test]
    fn inside_the_hero_there_is_no_offset() {
        for scroll_y in [0.0, 1.0, 400.0, HERO] {
            assert_eq!(scroll_offset(scroll_y, HERO, ABOUT, 100.0), 0.0);
            assert_eq!(transform_css(scroll_y, HERO, ABOUT, 100.0), "translateY(0)");
        }
    }

    #[test]
    fn between_the_sections_the_offset_is_proportional() {
        assert_eq!(scroll_offset(900.0, HERO, ABOUT, 100.0), 25.0);
        assert_eq!(scroll_offset(1000.0, HERO, ABOUT, 100.0), 50.0);
        assert_eq!(transform_css(1100.0, HERO, ABOUT, 100.0), "translateY(75px)");
    }

    #[test]
    fn past_the_about_section_the_offset_is_capped() {
        for scroll_y in [ABOUT, ABOUT + 1.0, 10_000.0] {
            assert_eq!(scroll_progress(scroll_y, HERO, ABOUT), 1.0);
            assert_eq!(scroll_offset(scroll_y, HERO, ABOUT, 100.0), 100.0);
        }
        assert_eq!(transform_css(5000.0, HERO, ABOUT, 100.0), "translateY(100px)");
    }

    #[test]
    fn equal_section_bounds_are_not_guarded() {
        // min(inf, 1) is 1, so the element still ends up fully offset
        assert_eq!(scroll_progress(900.0, HERO, HERO), 1.0);
        assert_eq!(scroll_progress(HERO, HERO, HERO), 0.0);
    }
}
