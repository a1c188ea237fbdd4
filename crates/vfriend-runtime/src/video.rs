//! Converts raw single-channel eye planes into display-ready colored pixels.

/// Width of one eye's display in pixels.
pub const SCREEN_WIDTH: usize = 384;
/// Height of one eye's display in pixels.
pub const SCREEN_HEIGHT: usize = 224;
/// Pixels per eye plane.
pub const SCREEN_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// Raw frame pair produced by the core, one intensity byte per pixel and eye.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub left: Vec<u8>,
    pub right: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const RED: Rgb = Rgb::new(0xFF, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// LED colors: intensity 255 maps to `foreground`, intensity 0 to `background`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedColors {
    pub foreground: Rgb,
    pub background: Rgb,
}

impl Default for LedColors {
    fn default() -> Self {
        Self {
            foreground: Rgb::RED,
            background: Rgb::BLACK,
        }
    }
}

/// Describes how a color is packed into the output byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorFormat {
    /// 4 bytes per pixel in R, G, B, A order.
    #[default]
    Rgba8888,
    /// 4 bytes per pixel in B, G, R, A order.
    Bgra8888,
}

impl ColorFormat {
    #[inline]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            ColorFormat::Rgba8888 | ColorFormat::Bgra8888 => 4,
        }
    }

    #[inline]
    fn pack(self, color: Rgb) -> [u8; 4] {
        match self {
            ColorFormat::Rgba8888 => [color.r, color.g, color.b, 0xFF],
            ColorFormat::Bgra8888 => [color.b, color.g, color.r, 0xFF],
        }
    }
}

/// A transformed pair of eye images, ready for the display pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StereoFrame {
    /// Monotonic production counter; frames are never delivered out of order.
    pub sequence: u64,
    pub width: usize,
    pub height: usize,
    pub format: ColorFormat,
    pub left: Vec<u8>,
    pub right: Vec<u8>,
}

impl StereoFrame {
    #[inline]
    pub fn pitch(&self) -> usize {
        self.width * self.format.bytes_per_pixel()
    }
}

/// Palette mapping plus eye-separation shift.
///
/// The palette is precomputed as a 256-entry lookup table so the per-pixel work
/// on the emulation thread is one table read and one copy.
#[derive(Debug, Clone)]
pub struct FrameTransform {
    colors: LedColors,
    format: ColorFormat,
    lut: Box<[[u8; 4]; 256]>,
}

impl FrameTransform {
    pub fn new(colors: LedColors, format: ColorFormat) -> Self {
        let mut transform = Self {
            colors,
            format,
            lut: Box::new([[0; 4]; 256]),
        };
        transform.rebuild_lut();
        transform
    }

    pub fn colors(&self) -> LedColors {
        self.colors
    }

    pub fn format(&self) -> ColorFormat {
        self.format
    }

    pub fn set_colors(&mut self, colors: LedColors) {
        self.colors = colors;
        self.rebuild_lut();
    }

    fn rebuild_lut(&mut self) {
        for (value, entry) in self.lut.iter_mut().enumerate() {
            *entry = self.format.pack(blend(self.colors, value as u8));
        }
    }

    /// Maps both eyes and shifts them apart horizontally.
    ///
    /// The left eye moves by `-separation` pixels and the right eye by
    /// `+separation`, rounded to whole pixels. Uncovered columns and missing
    /// source pixels show the background color.
    pub fn apply(&self, frame: &VideoFrame, separation: f32, sequence: u64) -> StereoFrame {
        let shift = separation.round() as isize;
        StereoFrame {
            sequence,
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            format: self.format,
            left: self.render_eye(&frame.left, -shift),
            right: self.render_eye(&frame.right, shift),
        }
    }

    fn render_eye(&self, plane: &[u8], shift: isize) -> Vec<u8> {
        let bpp = self.format.bytes_per_pixel();
        let background = self.lut[0];
        let mut out = vec![0u8; SCREEN_SIZE * bpp];

        for (y, row) in out.chunks_exact_mut(SCREEN_WIDTH * bpp).enumerate() {
            let src_row = y * SCREEN_WIDTH;
            for (x, pixel) in row.chunks_exact_mut(bpp).enumerate() {
                let src_x = x as isize - shift;
                let color = if (0..SCREEN_WIDTH as isize).contains(&src_x) {
                    plane
                        .get(src_row + src_x as usize)
                        .map_or(background, |value| self.lut[*value as usize])
                } else {
                    background
                };
                pixel.copy_from_slice(&color);
            }
        }

        out
    }
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::new(LedColors::default(), ColorFormat::default())
    }
}

fn blend(colors: LedColors, value: u8) -> Rgb {
    let mix = |background: u8, foreground: u8| -> u8 {
        let background = i32::from(background);
        let foreground = i32::from(foreground);
        let mixed = background + (foreground - background) * i32::from(value) / 255;
        mixed.clamp(0, 255) as u8
    };
    Rgb::new(
        mix(colors.background.r, colors.foreground.r),
        mix(colors.background.g, colors.foreground.g),
        mix(colors.background.b, colors.foreground.b),
    )
}
