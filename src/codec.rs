//! Image codec plugged into the extraction pipeline.
//!
//! Backed by the `image` crate: decode whatever it recognises from the raw
//! codestream, re-encode as PNG. Viewers built against encoders the `image`
//! crate has no decoder for will classify as failed in decode mode; `--raw`
//! sidesteps the codec entirely and always works.

use courier_extract::TextureCodec;
use courier_extract::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::Path;

#[derive(Debug, Default)]
pub struct ContainerCodec;

impl TextureCodec for ContainerCodec {
    type Image = image::DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Image> {
        image::load_from_memory(bytes).or_raise(|| ErrorKind::Codec("unrecognised codestream".into()))
    }

    fn encode(&self, image: &Self::Image, dest: &Path) -> Result<()> {
        image.save(dest).or_raise(|| ErrorKind::Codec(format!("failed to encode {}", dest.display())))
    }

    fn extension(&self) -> &'static str {
        "png"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_garbage() {
        let err = ContainerCodec.decode(&[0u8; 64]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Codec(_)));
    }

    #[test]
    fn test_roundtrip_png() {
        let dir = tempfile::tempdir().unwrap();
        let source = image::DynamicImage::new_rgb8(4, 4);
        let mut encoded = Vec::new();
        source
            .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
            .unwrap();
        let decoded = ContainerCodec.decode(&encoded).unwrap();
        let dest = dir.path().join("out.png");
        ContainerCodec.encode(&decoded, &dest).unwrap();
        assert!(dest.is_file());
    }
}
