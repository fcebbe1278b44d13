//! Static glyph-width tables for the two base-14 fonts the PDF writer uses.
//!
//! Widths are the Adobe AFM advance widths in 1/1000 em for ASCII
//! 0x20..=0x7E. Index = (char as usize) - 32. Anything outside that range is
//! measured with `average_width`.

/// Base-14 font faces used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Regular,
    Bold,
}

impl Face {
    /// PDF `BaseFont` name.
    pub fn base_font(self) -> &'static str {
        match self {
            Face::Regular => "Helvetica",
            Face::Bold => "Helvetica-Bold",
        }
    }

    /// Resource name used in content streams.
    pub fn resource_name(self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
        }
    }

    pub fn metrics(self) -> &'static FontMetricTable {
        match self {
            Face::Regular => &HELVETICA,
            Face::Bold => &HELVETICA_BOLD,
        }
    }
}

pub struct FontMetricTable {
    widths: [u16; 95],
    average_width: u16,
}

impl FontMetricTable {
    fn glyph_units(&self, c: char) -> u16 {
        let code = c as usize;
        if (32..=126).contains(&code) {
            self.widths[code - 32]
        } else {
            self.average_width
        }
    }

    /// Rendered width of `s` in points at `size_pt`.
    pub fn measure_str(&self, s: &str, size_pt: f32) -> f32 {
        let units: u32 = s.chars().map(|c| u32::from(self.glyph_units(c))).sum();
        units as f32 * size_pt / 1000.0
    }

    /// Greedy word wrap into lines no wider than `max_width` points.
    /// Words wider than a whole line are split at character boundaries.
    pub fn wrap(&self, text: &str, size_pt: f32, max_width: f32) -> Vec<String> {
        let space = self.measure_str(" ", size_pt);
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut current_width = 0.0_f32;

        for word in text.split_whitespace() {
            for piece in self.split_overlong(word, size_pt, max_width) {
                let width = self.measure_str(&piece, size_pt);
                if current.is_empty() {
                    current = piece;
                    current_width = width;
                } else if current_width + space + width > max_width {
                    lines.push(std::mem::take(&mut current));
                    current = piece;
                    current_width = width;
                } else {
                    current.push(' ');
                    current.push_str(&piece);
                    current_width += space + width;
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    fn split_overlong(&self, word: &str, size_pt: f32, max_width: f32) -> Vec<String> {
        if self.measure_str(word, size_pt) <= max_width {
            return vec![word.to_string()];
        }
        let mut pieces = Vec::new();
        let mut piece = String::new();
        let mut width = 0.0_f32;
        for c in word.chars() {
            let w = f32::from(self.glyph_units(c)) * size_pt / 1000.0;
            if !piece.is_empty() && width + w > max_width {
                pieces.push(std::mem::take(&mut piece));
                width = 0.0;
            }
            piece.push(c);
            width += w;
        }
        if !piece.is_empty() {
            pieces.push(piece);
        }
        pieces
    }
}

static HELVETICA: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0-9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :    ;    <    =    >    ?    @
        278, 278, 584, 584, 584, 556, 1015,
        // A    B    C    D    E    F    G    H    I    J    K    L    M
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
        // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [    \    ]    ^    _    `
        278, 278, 278, 469, 556, 333,
        // a    b    c    d    e    f    g    h    i    j    k    l    m
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
        // n    o    p    q    r    s    t    u    v    w    x    y    z
        556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
        // {    |    }    ~
        334, 260, 334, 584,
    ],
    average_width: 556,
};

static HELVETICA_BOLD: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0-9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :    ;    <    =    >    ?    @
        333, 333, 584, 584, 584, 611, 975,
        // A    B    C    D    E    F    G    H    I    J    K    L    M
        722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
        // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [    \    ]    ^    _    `
        333, 278, 333, 584, 556, 333,
        // a    b    c    d    e    f    g    h    i    j    k    l    m
        556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
        // n    o    p    q    r    s    t    u    v    w    x    y    z
        611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
        // {    |    }    ~
        389, 280, 389, 584,
    ],
    average_width: 611,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_known_widths() {
        // "Hi" = 722 + 222 units
        let w = Face::Regular.metrics().measure_str("Hi", 10.0);
        assert!((w - 9.44).abs() < 1e-4);
        assert!(
            Face::Bold.metrics().measure_str("Rust", 11.0)
                > Face::Regular.metrics().measure_str("Rust", 11.0)
        );
    }

    #[test]
    fn test_non_ascii_uses_average_width() {
        let m = Face::Regular.metrics();
        assert!((m.measure_str("é", 10.0) - 5.56).abs() < 1e-4);
    }

    #[test]
    fn test_wrap_respects_width_and_keeps_words() {
        let m = Face::Regular.metrics();
        let text = "Designed and shipped low latency services in Rust for payments";
        let lines = m.wrap(text, 11.0, 120.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(m.measure_str(line, 11.0) <= 120.0 + 1e-3, "{line} too wide");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_splits_overlong_words() {
        let m = Face::Regular.metrics();
        let word = "x".repeat(200);
        let lines = m.wrap(&word, 11.0, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_wrap_blank_text_has_no_lines() {
        assert!(Face::Regular.metrics().wrap("   ", 11.0, 100.0).is_empty());
    }
}
