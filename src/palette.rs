// Fixed pastel palette for series colors

use plotters::style::RGBColor;
use serde::Serialize;

/// Series colors in assignment order. Position `i` always gets entry `i mod N`.
pub const PASTEL_PALETTE: [PastelColor; 10] = [
    PastelColor::new("#A0D8B3", 0xA0, 0xD8, 0xB3),
    PastelColor::new("#AED9E0", 0xAE, 0xD9, 0xE0),
    PastelColor::new("#FFB5E8", 0xFF, 0xB5, 0xE8),
    PastelColor::new("#FFDAC1", 0xFF, 0xDA, 0xC1),
    PastelColor::new("#CBAACB", 0xCB, 0xAA, 0xCB),
    PastelColor::new("#F6DFEB", 0xF6, 0xDF, 0xEB),
    PastelColor::new("#C7CEEA", 0xC7, 0xCE, 0xEA),
    PastelColor::new("#E0BBE4", 0xE0, 0xBB, 0xE4),
    PastelColor::new("#B5EAD7", 0xB5, 0xEA, 0xD7),
    PastelColor::new("#FFABAB", 0xFF, 0xAB, 0xAB),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PastelColor {
    pub hex: &'static str,
    #[serde(skip)]
    rgb: (u8, u8, u8),
}

impl PastelColor {
    const fn new(hex: &'static str, r: u8, g: u8, b: u8) -> Self {
        Self { hex, rgb: (r, g, b) }
    }

    pub fn rgb(&self) -> RGBColor {
        let (r, g, b) = self.rgb;
        RGBColor(r, g, b)
    }
}

/// Color for the series at `index`, cycling through the palette.
pub fn palette_color(index: usize) -> PastelColor {
    PASTEL_PALETTE[index % PASTEL_PALETTE.len()]
}
