//! CSS color values.

/// Straight-alpha 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a CSS color: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`,
    /// `rgb()`/`rgba()` with comma, space or slash separators, or a basic
    /// color keyword.
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim().to_ascii_lowercase();

        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_functional(args);
        }
        named(&s)
    }

    /// Premultiplied RGBA bytes.
    pub fn premultiplied(&self) -> [u8; 4] {
        let mul = |c: u8| ((c as u16 * self.a as u16 + 127) / 255) as u8;
        [mul(self.r), mul(self.g), mul(self.b), self.a]
    }

    pub fn to_skia(&self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Color::rgba(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
        4 => Some(Color::rgba(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn parse_functional(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    let (rgb, alpha) = match parts.as_slice() {
        [r, g, b] => ([*r, *g, *b], None),
        [r, g, b, a] => ([*r, *g, *b], Some(*a)),
        _ => return None,
    };

    let channel = |v: &str| -> Option<u8> {
        let value = match v.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().ok()? * 2.55,
            None => v.parse::<f64>().ok()?,
        };
        Some(value.round().clamp(0.0, 255.0) as u8)
    };

    let a = match alpha {
        None => 255,
        Some(v) => {
            let value = match v.strip_suffix('%') {
                Some(pct) => pct.parse::<f64>().ok()? / 100.0,
                None => v.parse::<f64>().ok()?,
            };
            (value.clamp(0.0, 1.0) * 255.0).round() as u8
        }
    };

    Some(Color::rgba(channel(rgb[0])?, channel(rgb[1])?, channel(rgb[2])?, a))
}

fn named(name: &str) -> Option<Color> {
    let (r, g, b, a) = match name {
        "transparent" => (0, 0, 0, 0),
        "black" => (0, 0, 0, 255),
        "white" => (255, 255, 255, 255),
        "red" => (255, 0, 0, 255),
        "green" => (0, 128, 0, 255),
        "lime" => (0, 255, 0, 255),
        "blue" => (0, 0, 255, 255),
        "navy" => (0, 0, 128, 255),
        "yellow" => (255, 255, 0, 255),
        "cyan" | "aqua" => (0, 255, 255, 255),
        "magenta" | "fuchsia" => (255, 0, 255, 255),
        "orange" => (255, 165, 0, 255),
        "purple" => (128, 0, 128, 255),
        "teal" => (0, 128, 128, 255),
        "maroon" => (128, 0, 0, 255),
        "olive" => (128, 128, 0, 255),
        "silver" => (192, 192, 192, 255),
        "gray" | "grey" => (128, 128, 128, 255),
        _ => return None,
    };
    Some(Color::rgba(r, g, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(Color::parse("#fff"), Some(Color::rgba(255, 255, 255, 255)));
        assert_eq!(Color::parse("#0008"), Some(Color::rgba(0, 0, 0, 136)));
        assert_eq!(Color::parse("#FF8000"), Some(Color::rgba(255, 128, 0, 255)));
        assert_eq!(Color::parse("#ff800080"), Some(Color::rgba(255, 128, 0, 128)));
        assert_eq!(Color::parse("#ff80"), Some(Color::rgba(255, 255, 136, 0)));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("#gggggg"), None);
    }

    #[test]
    fn test_rgb_functions() {
        assert_eq!(Color::parse("rgb(0,64,255)"), Some(Color::rgba(0, 64, 255, 255)));
        assert_eq!(
            Color::parse("rgba(0,64,255,0.2)"),
            Some(Color::rgba(0, 64, 255, 51))
        );
        assert_eq!(
            Color::parse("rgba(255, 255, 255, .4)"),
            Some(Color::rgba(255, 255, 255, 102))
        );
        assert_eq!(
            Color::parse("rgb(10 20 30 / 50%)"),
            Some(Color::rgba(10, 20, 30, 128))
        );
        assert_eq!(Color::parse("rgb(100%,0%,0%)"), Some(Color::rgba(255, 0, 0, 255)));
        assert_eq!(Color::parse("rgb(1,2)"), None);
    }

    #[test]
    fn test_named() {
        assert_eq!(Color::parse("Red"), Some(Color::rgba(255, 0, 0, 255)));
        assert_eq!(Color::parse("transparent"), Some(Color::TRANSPARENT));
        assert_eq!(Color::parse("notacolor"), None);
    }

    #[test]
    fn test_premultiplied() {
        assert_eq!(Color::rgba(255, 128, 0, 255).premultiplied(), [255, 128, 0, 255]);
        assert_eq!(Color::rgba(255, 255, 255, 0).premultiplied(), [0, 0, 0, 0]);
        assert_eq!(Color::rgba(200, 100, 50, 128).premultiplied(), [100, 50, 25, 128]);
    }
}
