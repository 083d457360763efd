/// 8-bit RGBA colour used for tints, lights, fog and the clear colour.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Colour {
    pub const WHITE: Colour = Colour::rgba(0xFF, 0xFF, 0xFF, 0xFF);
    pub const BLACK: Colour = Colour::rgba(0x00, 0x00, 0x00, 0xFF);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 0xFF)
    }

    /// Normalized `[r, g, b, a]` for shaders.
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

impl Default for Colour {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_channels() {
        assert_eq!(Colour::WHITE.to_f32(), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(Colour::rgba(0, 0, 0, 0).to_f32(), [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(Colour::rgb(255, 0, 0).a, 0xFF);
    }
}
