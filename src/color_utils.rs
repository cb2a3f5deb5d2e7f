//lockcal/src/color_utils.rs

// Utilities for turning configured color strings into RGB triples.
// Calendars name their text color either with a plain color word ("green",
// "tab:blue") or a hex code ("#RRGGBB").

pub type Rgb = (u8, u8, u8);

pub const WHITE: Rgb = (255, 255, 255);
pub const BLACK: Rgb = (0, 0, 0);

/// Plain color words accepted in `text_color`, matching the usual plotting palette names.
const NAMED_COLORS: &[(&str, Rgb)] = &[
    ("white", (255, 255, 255)),
    ("black", (0, 0, 0)),
    ("gray", (128, 128, 128)),
    ("grey", (128, 128, 128)),
    ("lightgray", (211, 211, 211)),
    ("lightgrey", (211, 211, 211)),
    ("darkgray", (169, 169, 169)),
    ("darkgrey", (169, 169, 169)),
    ("silver", (192, 192, 192)),
    ("red", (255, 0, 0)),
    ("darkred", (139, 0, 0)),
    ("green", (0, 128, 0)),
    ("lime", (0, 255, 0)),
    ("lightgreen", (144, 238, 144)),
    ("darkgreen", (0, 100, 0)),
    ("blue", (0, 0, 255)),
    ("lightblue", (173, 216, 230)),
    ("skyblue", (135, 206, 235)),
    ("navy", (0, 0, 128)),
    ("cyan", (0, 255, 255)),
    ("teal", (0, 128, 128)),
    ("magenta", (255, 0, 255)),
    ("purple", (128, 0, 128)),
    ("violet", (238, 130, 238)),
    ("pink", (255, 192, 203)),
    ("orange", (255, 165, 0)),
    ("gold", (255, 215, 0)),
    ("yellow", (255, 255, 0)),
    ("brown", (165, 42, 42)),
    ("tan", (210, 180, 140)),
    ("coral", (255, 127, 80)),
    ("salmon", (250, 128, 114)),
    ("turquoise", (64, 224, 208)),
    ("tab:blue", (31, 119, 180)),
    ("tab:orange", (255, 127, 14)),
    ("tab:green", (44, 160, 44)),
    ("tab:red", (214, 39, 40)),
    ("tab:purple", (148, 103, 189)),
    ("tab:brown", (140, 86, 75)),
    ("tab:pink", (227, 119, 194)),
    ("tab:gray", (127, 127, 127)),
    ("tab:olive", (188, 189, 34)),
    ("tab:cyan", (23, 190, 207)),
];

/// Parse a hex color string like "#RRGGBB" or "RRGGBB" into u8 tuple.
pub fn parse_hex_to_u8(hex: &str) -> Option<Rgb> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Resolve a configured color (name or hex). Names are case-insensitive.
pub fn parse_color(value: &str) -> Option<Rgb> {
    let value = value.trim();
    if value.starts_with('#') {
        return parse_hex_to_u8(value);
    }
    let lower = value.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, rgb)| *rgb)
        .or_else(|| parse_hex_to_u8(value))
}

/// Like `parse_color`, but falls back to white and says so.
pub fn parse_color_or_white(value: &str) -> Rgb {
    parse_color(value).unwrap_or_else(|| {
        log::warn!("Unknown color '{}', using white", value);
        WHITE
    })
}

/// Alpha-composite `src` over `dst`. `alpha` is in [0, 255].
pub fn blend(dst: Rgb, src: Rgb, alpha: u8) -> Rgb {
    let a = alpha as u16;
    let inv = 255 - a;
    let mix = |d: u8, s: u8| ((s as u16 * a + d as u16 * inv + 127) / 255) as u8;
    (mix(dst.0, src.0), mix(dst.1, src.1), mix(dst.2, src.2))
}
