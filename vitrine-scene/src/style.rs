use crate::error::{SceneError, SceneResult};

/// An RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color([r, g, b, 255])
    }
}

/// Parse a `#rgb`, `#rrggbb` or `#rrggbbaa` hex color.
pub fn parse_hex_color(value: &str) -> SceneResult<Color> {
    let err = |reason: &str| SceneError::InvalidColor {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let hex = value
        .strip_prefix('#')
        .ok_or_else(|| err("must start with '#'"))?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(err("contains non-hex digits"));
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| err("bad hex digit"));
    match hex.len() {
        3 => {
            let mut out = [0u8; 4];
            for (i, c) in hex.chars().enumerate() {
                let v = channel(&c.to_string())?;
                out[i] = v * 16 + v;
            }
            out[3] = 255;
            Ok(Color(out))
        }
        6 | 8 => {
            let mut out = [0, 0, 0, 255u8];
            for i in 0..hex.len() / 2 {
                out[i] = channel(&hex[i * 2..i * 2 + 2])?;
            }
            Ok(Color(out))
        }
        _ => Err(err("must be #rgb, #rrggbb or #rrggbbaa")),
    }
}

/// Fixed dark palette used when an element sets no explicit colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub surface: Color,
    pub border: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::rgb(0x09, 0x09, 0x0b),
            surface: Color::rgb(0x27, 0x27, 0x2a),
            border: Color::rgb(0x3f, 0x3f, 0x46),
            text: Color::rgb(0xe4, 0xe4, 0xe7),
            muted: Color::rgb(0xa1, 0xa1, 0xaa),
            accent: Color::rgb(0xf5, 0x9e, 0x0b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_hex() {
        assert_eq!(parse_hex_color("#fff").unwrap(), Color::rgb(255, 255, 255));
        assert_eq!(
            parse_hex_color("#09090b").unwrap(),
            Color::rgb(0x09, 0x09, 0x0b)
        );
        assert_eq!(
            parse_hex_color("#ff000080").unwrap(),
            Color([255, 0, 0, 0x80])
        );
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(matches!(
            parse_hex_color("red"),
            Err(SceneError::InvalidColor { .. })
        ));
        assert!(matches!(
            parse_hex_color("#12345"),
            Err(SceneError::InvalidColor { .. })
        ));
        assert!(matches!(
            parse_hex_color("#gggggg"),
            Err(SceneError::InvalidColor { .. })
        ));
    }
}
