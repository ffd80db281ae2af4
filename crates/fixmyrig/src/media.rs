//! Media types of image files.

use std::path::Path;

use mime::Mime;

/// The media type assumed when a file does not tell.
pub const DEFAULT_MEDIA_TYPE: Mime = mime::IMAGE_JPEG;

/// Guesses the media type of an image from its file extension.
///
/// Unknown or missing extensions fall back to [`DEFAULT_MEDIA_TYPE`].
pub fn media_type_for_path<P: AsRef<Path>>(path: P) -> Mime {
    let Some(ext) = path.as_ref().extension().and_then(|ext| ext.to_str())
    else {
        return DEFAULT_MEDIA_TYPE;
    };
    let media_type = match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => return mime::IMAGE_JPEG,
        "png" => return mime::IMAGE_PNG,
        "gif" => return mime::IMAGE_GIF,
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => return DEFAULT_MEDIA_TYPE,
    };
    media_type.parse().unwrap_or(DEFAULT_MEDIA_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_for_path() {
        assert_eq!(media_type_for_path("gpu.png"), mime::IMAGE_PNG);
        assert_eq!(media_type_for_path("/tmp/RAM.JPG"), mime::IMAGE_JPEG);
        assert_eq!(media_type_for_path("board.gif"), mime::IMAGE_GIF);
        assert_eq!(
            media_type_for_path("psu.webp").essence_str(),
            "image/webp"
        );
        assert_eq!(
            media_type_for_path("IMG_0001.HEIC").essence_str(),
            "image/heic"
        );
        assert_eq!(media_type_for_path("photo"), DEFAULT_MEDIA_TYPE);
        assert_eq!(media_type_for_path("notes.txt"), DEFAULT_MEDIA_TYPE);
    }
}
