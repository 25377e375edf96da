use crate::geometry::Rgb;

use super::LabelSet;

/// Swatches offered when creating or recoloring a segment.
pub const SEGMENT_COLOR_PALETTE: &[Rgb] = &[
    Rgb::new(0xff, 0x00, 0x00),
    Rgb::new(0x00, 0xff, 0x00),
    Rgb::new(0x00, 0x00, 0xff),
    Rgb::new(0xf4, 0x4e, 0x3b),
    Rgb::new(0xfe, 0x92, 0x00),
    Rgb::new(0xfc, 0xdc, 0x00),
    Rgb::new(0xdb, 0xdf, 0x00),
    Rgb::new(0xa4, 0xdd, 0x00),
    Rgb::new(0x68, 0xcc, 0xca),
    Rgb::new(0x73, 0xd8, 0xff),
    Rgb::new(0xae, 0xa1, 0xff),
    Rgb::new(0xfd, 0xa1, 0xff),
    Rgb::new(0x00, 0x88, 0x00),
    Rgb::new(0x00, 0xff, 0xff),
    Rgb::new(0xff, 0x00, 0xff),
    Rgb::new(0xd3, 0x31, 0x15),
    Rgb::new(0xe2, 0x73, 0x00),
    Rgb::new(0xfc, 0xc4, 0x00),
    Rgb::new(0xb0, 0xbc, 0x00),
    Rgb::new(0x68, 0xbc, 0x00),
    Rgb::new(0x16, 0xa5, 0xa5),
    Rgb::new(0x00, 0x9c, 0xe0),
    Rgb::new(0x7b, 0x64, 0xff),
    Rgb::new(0xfa, 0x28, 0xff),
    Rgb::new(0xff, 0xff, 0x00),
    Rgb::new(0x00, 0x00, 0x00),
    Rgb::new(0xff, 0xff, 0xff),
    Rgb::new(0x9f, 0x05, 0x00),
    Rgb::new(0xc4, 0x51, 0x00),
    Rgb::new(0xfb, 0x9e, 0x00),
    Rgb::new(0x80, 0x89, 0x00),
    Rgb::new(0x19, 0x4d, 0x33),
    Rgb::new(0x0c, 0x79, 0x7d),
    Rgb::new(0x00, 0x62, 0xb1),
    Rgb::new(0x65, 0x32, 0x94),
    Rgb::new(0xab, 0x14, 0x9e),
];

const NEW_SEGMENT_COLOR: Rgb = Rgb::new(0, 0, 255);

/// First swatch not yet taken by `labels`, starting from blue.
pub fn default_new_segment_color(labels: &LabelSet) -> Option<Rgb> {
    std::iter::once(NEW_SEGMENT_COLOR)
        .chain(SEGMENT_COLOR_PALETTE.iter().copied())
        .find(|color| labels.find_by_color(*color).is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_segment_prefers_blue_then_first_free_swatch() {
        let mut labels = LabelSet::new();
        assert_eq!(default_new_segment_color(&labels), Some(Rgb::new(0, 0, 255)));

        labels.add("blue", Rgb::new(0, 0, 255)).expect("add blue");
        labels.add("red", Rgb::new(255, 0, 0)).expect("add red");
        assert_eq!(default_new_segment_color(&labels), Some(Rgb::new(0, 255, 0)));
    }

    #[test]
    fn palette_has_no_duplicates() {
        for (index, color) in SEGMENT_COLOR_PALETTE.iter().enumerate() {
            assert!(
                !SEGMENT_COLOR_PALETTE[index + 1..].contains(color),
                "{color} listed twice"
            );
        }
    }
}
