//! Mapping from terminal colors onto the small palette the agent's TUI
//! actually uses.
//!
//! Claude Code distinguishes prose (default foreground), code and diff
//! bodies (greyscale), headings (bold default), UI chrome (greys and the
//! accent colors). Everything the classifier and renderer need is "which
//! bucket", not the exact RGB, so the full color space collapses to eight
//! tags here.

/// Foreground color bucket of a cell or span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorTag {
    #[default]
    Default,
    BrightCyan,
    DimGrey,
    Yellow,
    Green,
    Red,
    Magenta,
    Blue,
}

impl ColorTag {
    /// Collapse a vt100 color into a palette tag.
    ///
    /// Indexed colors 0–15 map by ANSI convention (7/15 white and 0 black
    /// fold into `Default`, 8 is the canonical dim grey). The 6×6×6 cube is
    /// resolved through its RGB levels, and the greyscale ramp 232–255 is
    /// all `DimGrey`.
    pub fn from_vt(color: vt100::Color) -> Self {
        match color {
            vt100::Color::Default => ColorTag::Default,
            vt100::Color::Idx(i) => Self::from_index(i),
            vt100::Color::Rgb(r, g, b) => Self::from_rgb(r, g, b),
        }
    }

    fn from_index(i: u8) -> Self {
        match i {
            1 | 9 => ColorTag::Red,
            2 | 10 => ColorTag::Green,
            3 | 11 => ColorTag::Yellow,
            4 | 12 => ColorTag::Blue,
            5 | 13 => ColorTag::Magenta,
            6 | 14 => ColorTag::BrightCyan,
            8 => ColorTag::DimGrey,
            0 | 7 | 15 => ColorTag::Default,
            232..=255 => ColorTag::DimGrey,
            16..=231 => {
                // 6x6x6 color cube: decompose into 0..=5 levels per channel.
                let c = i - 16;
                let r = c / 36;
                let g = (c % 36) / 6;
                let b = c % 6;
                let scale = |v: u8| v * 51;
                Self::from_rgb(scale(r), scale(g), scale(b))
            }
        }
    }

    fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let (r, g, b) = (r as i32, g as i32, b as i32);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);

        // Low-saturation colors are greys: dim unless near-white.
        if max - min < 32 {
            return if max >= 0xf0 {
                ColorTag::Default
            } else {
                ColorTag::DimGrey
            };
        }

        let near = |a: i32, b: i32| (a - b).abs() < 48;
        if near(r, g) && r > b {
            ColorTag::Yellow
        } else if near(g, b) && g > r {
            ColorTag::BrightCyan
        } else if near(r, b) && r > g {
            ColorTag::Magenta
        } else if r == max {
            ColorTag::Red
        } else if g == max {
            ColorTag::Green
        } else {
            ColorTag::Blue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_indexed_colors() {
        assert_eq!(ColorTag::from_index(1), ColorTag::Red);
        assert_eq!(ColorTag::from_index(10), ColorTag::Green);
        assert_eq!(ColorTag::from_index(14), ColorTag::BrightCyan);
        assert_eq!(ColorTag::from_index(8), ColorTag::DimGrey);
        assert_eq!(ColorTag::from_index(7), ColorTag::Default);
    }

    #[test]
    fn test_greyscale_ramp_is_dim() {
        for i in 232..=255u8 {
            assert_eq!(ColorTag::from_index(i), ColorTag::DimGrey);
        }
    }

    #[test]
    fn test_rgb_buckets() {
        assert_eq!(ColorTag::from_rgb(200, 40, 40), ColorTag::Red);
        assert_eq!(ColorTag::from_rgb(40, 200, 40), ColorTag::Green);
        assert_eq!(ColorTag::from_rgb(220, 210, 60), ColorTag::Yellow);
        assert_eq!(ColorTag::from_rgb(60, 200, 210), ColorTag::BrightCyan);
        assert_eq!(ColorTag::from_rgb(180, 60, 190), ColorTag::Magenta);
        assert_eq!(ColorTag::from_rgb(120, 120, 128), ColorTag::DimGrey);
        assert_eq!(ColorTag::from_rgb(250, 250, 250), ColorTag::Default);
    }
}
