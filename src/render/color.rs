// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! CSS color parsing.
//!
//! Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(...)`, `rgba(...)`
//! and CSS named colors. Output is always `#rrggbb`; alpha is reported
//! separately so it can become the shape's opacity.

pub const FALLBACK_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedColor {
    pub hex: String,
    /// Alpha in `[0, 1]`, rounded to two decimals.
    pub alpha: f64,
}

const NAMED_COLORS: &[(&str, &str)] = &[
    ("aliceblue", "#f0f8ff"),
    ("antiquewhite", "#faebd7"),
    ("aqua", "#00ffff"),
    ("aquamarine", "#7fffd4"),
    ("azure", "#f0ffff"),
    ("beige", "#f5f5dc"),
    ("bisque", "#ffe4c4"),
    ("black", "#000000"),
    ("blanchedalmond", "#ffebcd"),
    ("blue", "#0000ff"),
    ("blueviolet", "#8a2be2"),
    ("brown", "#a52a2a"),
    ("burlywood", "#deb887"),
    ("cadetblue", "#5f9ea0"),
    ("chartreuse", "#7fff00"),
    ("chocolate", "#d2691e"),
    ("coral", "#ff7f50"),
    ("cornflowerblue", "#6495ed"),
    ("cornsilk", "#fff8dc"),
    ("crimson", "#dc143c"),
    ("cyan", "#00ffff"),
    ("darkblue", "#00008b"),
    ("darkcyan", "#008b8b"),
    ("darkgoldenrod", "#b8860b"),
    ("darkgray", "#a9a9a9"),
    ("darkgreen", "#006400"),
    ("darkgrey", "#a9a9a9"),
    ("darkkhaki", "#bdb76b"),
    ("darkmagenta", "#8b008b"),
    ("darkolivegreen", "#556b2f"),
    ("darkorange", "#ff8c00"),
    ("darkorchid", "#9932cc"),
    ("darkred", "#8b0000"),
    ("darksalmon", "#e9967a"),
    ("darkseagreen", "#8fbc8f"),
    ("darkslateblue", "#483d8b"),
    ("darkslategray", "#2f4f4f"),
    ("darkslategrey", "#2f4f4f"),
    ("darkturquoise", "#00ced1"),
    ("darkviolet", "#9400d3"),
    ("deeppink", "#ff1493"),
    ("deepskyblue", "#00bfff"),
    ("dimgray", "#696969"),
    ("dimgrey", "#696969"),
    ("dodgerblue", "#1e90ff"),
    ("firebrick", "#b22222"),
    ("floralwhite", "#fffaf0"),
    ("forestgreen", "#228b22"),
    ("fuchsia", "#ff00ff"),
    ("gainsboro", "#dcdcdc"),
    ("ghostwhite", "#f8f8ff"),
    ("gold", "#ffd700"),
    ("goldenrod", "#daa520"),
    ("gray", "#808080"),
    ("green", "#008000"),
    ("greenyellow", "#adff2f"),
    ("grey", "#808080"),
    ("honeydew", "#f0fff0"),
    ("hotpink", "#ff69b4"),
    ("indianred", "#cd5c5c"),
    ("indigo", "#4b0082"),
    ("ivory", "#fffff0"),
    ("khaki", "#f0e68c"),
    ("lavender", "#e6e6fa"),
    ("lavenderblush", "#fff0f5"),
    ("lawngreen", "#7cfc00"),
    ("lemonchiffon", "#fffacd"),
    ("lightblue", "#add8e6"),
    ("lightcoral", "#f08080"),
    ("lightcyan", "#e0ffff"),
    ("lightgoldenrodyellow", "#fafad2"),
    ("lightgray", "#d3d3d3"),
    ("lightgreen", "#90ee90"),
    ("lightgrey", "#d3d3d3"),
    ("lightpink", "#ffb6c1"),
    ("lightsalmon", "#ffa07a"),
    ("lightseagreen", "#20b2aa"),
    ("lightskyblue", "#87cefa"),
    ("lightslategray", "#778899"),
    ("lightslategrey", "#778899"),
    ("lightsteelblue", "#b0c4de"),
    ("lightyellow", "#ffffe0"),
    ("lime", "#00ff00"),
    ("limegreen", "#32cd32"),
    ("linen", "#faf0e6"),
    ("magenta", "#ff00ff"),
    ("maroon", "#800000"),
    ("mediumaquamarine", "#66cdaa"),
    ("mediumblue", "#0000cd"),
    ("mediumorchid", "#ba55d3"),
    ("mediumpurple", "#9370db"),
    ("mediumseagreen", "#3cb371"),
    ("mediumslateblue", "#7b68ee"),
    ("mediumspringgreen", "#00fa9a"),
    ("mediumturquoise", "#48d1cc"),
    ("mediumvioletred", "#c71585"),
    ("midnightblue", "#191970"),
    ("mintcream", "#f5fffa"),
    ("mistyrose", "#ffe4e1"),
    ("moccasin", "#ffe4b5"),
    ("navajowhite", "#ffdead"),
    ("navy", "#000080"),
    ("oldlace", "#fdf5e6"),
    ("olive", "#808000"),
    ("olivedrab", "#6b8e23"),
    ("orange", "#ffa500"),
    ("orangered", "#ff4500"),
    ("orchid", "#da70d6"),
    ("palegoldenrod", "#eee8aa"),
    ("palegreen", "#98fb98"),
    ("paleturquoise", "#afeeee"),
    ("palevioletred", "#db7093"),
    ("papayawhip", "#ffefd5"),
    ("peachpuff", "#ffdab9"),
    ("peru", "#cd853f"),
    ("pink", "#ffc0cb"),
    ("plum", "#dda0dd"),
    ("powderblue", "#b0e0e6"),
    ("purple", "#800080"),
    ("rebeccapurple", "#663399"),
    ("red", "#ff0000"),
    ("rosybrown", "#bc8f8f"),
    ("royalblue", "#4169e1"),
    ("saddlebrown", "#8b4513"),
    ("salmon", "#fa8072"),
    ("sandybrown", "#f4a460"),
    ("seagreen", "#2e8b57"),
    ("seashell", "#fff5ee"),
    ("sienna", "#a0522d"),
    ("silver", "#c0c0c0"),
    ("skyblue", "#87ceeb"),
    ("slateblue", "#6a5acd"),
    ("slategray", "#708090"),
    ("slategrey", "#708090"),
    ("snow", "#fffafa"),
    ("springgreen", "#00ff7f"),
    ("steelblue", "#4682b4"),
    ("tan", "#d2b48c"),
    ("teal", "#008080"),
    ("thistle", "#d8bfd8"),
    ("tomato", "#ff6347"),
    ("turquoise", "#40e0d0"),
    ("violet", "#ee82ee"),
    ("wheat", "#f5deb3"),
    ("white", "#ffffff"),
    ("whitesmoke", "#f5f5f5"),
    ("yellow", "#ffff00"),
    ("yellowgreen", "#9acd32"),
];

fn round_alpha(alpha: f64) -> f64 {
    (alpha.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

fn parse_hex(digits: &str) -> Option<ParsedColor> {
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match digits.len() {
        3 | 4 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => digits.to_string(),
        _ => return None,
    };
    let alpha = match expanded.get(6..8) {
        Some(aa) => round_alpha(u8::from_str_radix(aa, 16).ok()? as f64 / 255.0),
        None => 1.0,
    };
    Some(ParsedColor {
        hex: format!("#{}", &expanded[..6]),
        alpha,
    })
}

fn parse_channel(text: &str) -> Option<u8> {
    let text = text.trim();
    let value = match text.strip_suffix('%') {
        Some(percent) => percent.trim().parse::<f64>().ok()? * 2.55,
        None => text.parse::<f64>().ok()?,
    };
    value
        .is_finite()
        .then(|| value.round().clamp(0.0, 255.0) as u8)
}

fn parse_alpha(text: &str) -> Option<f64> {
    let text = text.trim();
    let value = match text.strip_suffix('%') {
        Some(percent) => percent.trim().parse::<f64>().ok()? / 100.0,
        None => text.parse::<f64>().ok()?,
    };
    value.is_finite().then(|| round_alpha(value))
}

fn parse_functional(color: &str) -> Option<ParsedColor> {
    let inner = color
        .strip_prefix("rgba(")
        .or_else(|| color.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let parts: Vec<&str> = inner.split(',').collect();
    let (r, g, b, alpha) = match parts.as_slice() {
        [r, g, b] => (r, g, b, 1.0),
        [r, g, b, a] => (r, g, b, parse_alpha(a)?),
        _ => return None,
    };
    Some(ParsedColor {
        hex: format!(
            "#{:02x}{:02x}{:02x}",
            parse_channel(r)?,
            parse_channel(g)?,
            parse_channel(b)?
        ),
        alpha,
    })
}

pub fn parse_color(input: &str) -> Option<ParsedColor> {
    let color = input.trim().to_ascii_lowercase();
    if let Some(digits) = color.strip_prefix('#') {
        return parse_hex(digits);
    }
    if color.starts_with("rgb") {
        return parse_functional(&color);
    }
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == color)
        .map(|(_, hex)| ParsedColor {
            hex: hex.to_string(),
            alpha: 1.0,
        })
}

/// Normalize a user color, promoting a translucent alpha to opacity.
///
/// Returns the `#rrggbb` color and the opacity to use: an explicit opacity
/// always wins, otherwise an alpha other than 1 is used.
pub fn normalize_color(color: &str, opacity: Option<f64>) -> (String, Option<f64>) {
    match parse_color(color) {
        Some(parsed) => {
            let opacity = opacity.or((parsed.alpha < 1.0).then_some(parsed.alpha));
            (parsed.hex, opacity)
        }
        None => (FALLBACK_COLOR.to_string(), opacity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_forms() {
        assert_eq!(parse_color("#F00").unwrap().hex, "#ff0000");
        assert_eq!(parse_color("#00ff00").unwrap().hex, "#00ff00");
        let short_alpha = parse_color("#0008").unwrap();
        assert_eq!(short_alpha.hex, "#000000");
        assert_eq!(short_alpha.alpha, 0.53);
        assert!(parse_color("#12345").is_none());
        assert!(parse_color("#ggg").is_none());
    }

    #[test]
    fn test_alpha_promoted_to_opacity() {
        let (color, opacity) = normalize_color("#ff000080", None);
        assert_eq!(color, "#ff0000");
        assert!((opacity.unwrap() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_explicit_opacity_wins() {
        assert_eq!(
            normalize_color("red", Some(0.3)),
            ("#ff0000".to_string(), Some(0.3))
        );
        assert_eq!(
            normalize_color("rgba(255, 0, 0, 0.2)", Some(0.9)),
            ("#ff0000".to_string(), Some(0.9))
        );
    }

    #[test]
    fn test_functional_notation() {
        let parsed = parse_color("rgba(10, 20, 30, 0.25)").unwrap();
        assert_eq!(parsed.hex, "#0a141e");
        assert_eq!(parsed.alpha, 0.25);
        assert_eq!(parse_color("rgb(100%, 0%, 0%)").unwrap().hex, "#ff0000");
        assert!(parse_color("rgb(1, 2)").is_none());
    }

    #[test]
    fn test_unknown_color_falls_back() {
        assert_eq!(
            normalize_color("not-a-color", None),
            (FALLBACK_COLOR.to_string(), None)
        );
        assert_eq!(normalize_color("Teal", None), ("#008080".to_string(), None));
    }
}
