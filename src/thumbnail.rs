use eframe::egui::ColorImage;
use tracing::debug;

/// Downloads and decodes the thumbnail a `/get_info` reply pointed at.
pub fn fetch_thumbnail(url: &str) -> Option<ColorImage> {
    if url.is_empty() {
        return None;
    }
    // Perform a blocking HTTP GET request, returning None on any error
    let resp = reqwest::blocking::get(url).ok()?.error_for_status().ok()?.bytes().ok()?;
    let img = match image::load_from_memory(&resp) {
        Ok(img) => img.to_rgba8(),
        Err(e) => {
            debug!(url, "thumbnail is not a decodable image: {e}");
            return None;
        }
    };
    let size = [img.width() as usize, img.height() as usize];
    // Create a ColorImage from the raw RGBA bytes without premultiplying alpha
    Some(ColorImage::from_rgba_unmultiplied(size, &img))
}
