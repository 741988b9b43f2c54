use crate::{error::Result, image::ImageHeader, scanner};

/// Reads the geometry and precision of a JPEG without decoding it.
pub fn get_info(input: &[u8]) -> Result<ImageHeader> {
    let header = scanner::scan(input)?;
    log::debug!(
        "{}x{}, {} components, {} bit",
        header.width,
        header.height,
        header.num_components,
        header.data_precision
    );
    Ok(header)
}
