#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ContentEncoding {
    Brotli,
    Gzip,
}

impl ContentEncoding {
    /// Maps a compressed-file extension (leading dot included) to its encoding.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            ".br" => Some(Self::Brotli),
            ".gz" => Some(Self::Gzip),
            _ => None,
        }
    }

    /// The `Content-Encoding` token for this encoding.
    pub fn token(self) -> &'static str {
        match self {
            Self::Brotli => "br",
            Self::Gzip => "gzip",
        }
    }
}
