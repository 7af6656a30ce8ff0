/// Terminal-style base color codes understood by the panel firmware.
///
/// The discriminant is the single-digit code the display expects; foreground
/// and background selection add 30 or 40 on top of it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, clap::ValueEnum)]
pub enum Color {
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
    Default = 9,
}

impl Color {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl From<Color> for u8 {
    fn from(c: Color) -> u8 {
        c.code()
    }
}
