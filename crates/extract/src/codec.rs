//! Seam to the external image codec.
//!
//! The cache stores raw codestreams that most tooling cannot open directly;
//! extraction optionally re-encodes them into a friendlier container. This
//! crate never links a codec itself — callers plug one in through
//! [`TextureCodec`], and raw mode bypasses it entirely.

use crate::error::Result;
use std::path::Path;

/// A decode/encode pair over some opaque in-memory image type.
///
/// Implementations must be shareable across workers; decode and encode are
/// called concurrently for distinct items.
pub trait TextureCodec: Send + Sync {
    type Image: Send;

    /// Decode a raw codestream into an in-memory image.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Codec`](crate::error::ErrorKind::Codec) when the
    /// codestream is rejected. The pipeline classifies this as a per-item
    /// failure; it never aborts the run.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Image>;

    /// Encode an image into the container format implied by `dest`'s
    /// extension.
    fn encode(&self, image: &Self::Image, dest: &Path) -> Result<()>;

    /// File extension for encoded output, without the dot.
    fn extension(&self) -> &'static str;
}

pub mod mock {
    //! A fake codec for tests: "decoding" keeps the input bytes, "encoding"
    //! writes them out verbatim.

    use super::TextureCodec;
    use crate::error::{ErrorKind, Result};
    use exn::ResultExt;
    use std::path::Path;

    #[derive(Debug, Default)]
    pub struct MockCodec {
        /// When set, every decode is rejected, as if all codestreams were
        /// corrupt.
        pub reject: bool,
    }

    impl MockCodec {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn rejecting() -> Self {
            Self { reject: true }
        }
    }

    impl TextureCodec for MockCodec {
        type Image = Vec<u8>;

        fn decode(&self, bytes: &[u8]) -> Result<Self::Image> {
            if self.reject {
                exn::bail!(ErrorKind::Codec("mock codec rejects everything".into()));
            }
            Ok(bytes.to_vec())
        }

        fn encode(&self, image: &Self::Image, dest: &Path) -> Result<()> {
            std::fs::write(dest, image).or_raise(|| ErrorKind::Write(dest.to_path_buf()))
        }

        fn extension(&self) -> &'static str {
            "png"
        }
    }
}
