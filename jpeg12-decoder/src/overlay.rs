use crate::{error::Result, image::ImageHeader, mask::BitMask2D};

/// Forces decoded samples to agree with the Zen mask.
///
/// Pixels inside the mask keep their value, except that zero becomes one so
/// they stay distinguishable from no-data. Pixels outside the mask become
/// zero on every channel. An empty segment marks the whole image as inside.
/// Runs once, over the complete sample buffer, after decoding.
pub fn apply(segment: &[u8], header: &ImageHeader, samples: &mut [u16]) -> Result<()> {
    if segment.is_empty() {
        let mut raised = 0usize;
        for sample in samples.iter_mut().filter(|s| **s == 0) {
            *sample = 1;
            raised += 1;
        }
        log::debug!("empty zen mask, raised {raised} zero samples");
        return Ok(());
    }

    let width = header.width as usize;
    let channels = header.num_components as usize;
    if width == 0 || channels == 0 {
        return Ok(());
    }

    let mut mask = BitMask2D::new(width, header.height as usize);
    mask.load(segment)?;

    let mut cleared = 0usize;
    for (index, pixel) in samples.chunks_exact_mut(channels).enumerate() {
        if mask.is_set(index % width, index / width) {
            for sample in pixel.iter_mut().filter(|s| **s == 0) {
                *sample = 1;
            }
        } else {
            pixel.fill(0);
            cleared += 1;
        }
    }
    log::debug!("zen mask applied, {cleared} pixels cleared");
    Ok(())
}
