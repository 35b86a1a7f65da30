use palette::Srgb;

// ---------------------------------------------------------------------------
// Series palette
// ---------------------------------------------------------------------------

/// Fixed series colours, assigned by series index modulo the palette length.
pub const SERIES_PALETTE: [&str; 5] = ["#FF6B35", "#00A9E0", "#84BD00", "#FFD100", "#7C878E"];

/// Fallback for colours that fail to parse.
const DEFAULT_RGB: [u8; 3] = [0x7C, 0x87, 0x8E];

/// Colour of the `index`-th series.
pub fn series_color(index: usize) -> &'static str {
    SERIES_PALETTE[index % SERIES_PALETTE.len()]
}

// ---------------------------------------------------------------------------
// Hex → RGB
// ---------------------------------------------------------------------------

/// Parse `#rrggbb` / `#rgb` into RGB bytes, gray when unparseable.
pub fn hex_to_rgb(hex: &str) -> [u8; 3] {
    match hex.trim().parse::<Srgb<u8>>() {
        Ok(rgb) => [rgb.red, rgb.green, rgb.blue],
        Err(_) => DEFAULT_RGB,
    }
}
