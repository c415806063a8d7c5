use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::config::MediaConfig;

pub struct ProcessedImage {
    pub data: Vec<u8>,
    pub thumbnail: Option<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    pub mime_type: String,
}

/// 解码、按需转 WebP、生成缩略图
///
/// GIF 保持原样（转码会丢失动画），缩略图仍取第一帧。
pub fn process_image(input: &[u8], config: &MediaConfig) -> Result<ProcessedImage> {
    let img = image::load_from_memory(input).context("无法解码图片")?;
    let format = image::guess_format(input).ok();

    let convert = config.auto_webp && !matches!(format, Some(ImageFormat::WebP | ImageFormat::Gif));
    let (data, mime_type) = if convert {
        match encode(&img, ImageFormat::WebP) {
            Ok(webp) => (webp, "image/webp".to_string()),
            Err(e) => {
                tracing::warn!("WebP 转码失败，保留原图：{e}");
                (input.to_vec(), format_to_mime(format).to_string())
            }
        }
    } else {
        (input.to_vec(), format_to_mime(format).to_string())
    };

    let thumbnail = if config.generate_thumb && img.width() > config.thumb_width {
        let thumb = img.thumbnail(config.thumb_width, u32::MAX);
        let thumb_format = if mime_type == "image/webp" {
            ImageFormat::WebP
        } else {
            format.filter(|f| *f != ImageFormat::Gif).unwrap_or(ImageFormat::Png)
        };
        encode(&thumb, thumb_format).ok()
    } else {
        None
    };

    Ok(ProcessedImage {
        data,
        thumbnail,
        width: img.width(),
        height: img.height(),
        mime_type,
    })
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    if format == ImageFormat::WebP {
        let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut buf);
        img.write_with_encoder(encoder).context("WebP 编码失败")?;
    } else {
        img.write_to(&mut buf, format).context("图片编码失败")?;
    }
    Ok(buf.into_inner())
}

fn format_to_mime(format: Option<ImageFormat>) -> &'static str {
    match format {
        Some(ImageFormat::Jpeg) => "image/jpeg",
        Some(ImageFormat::Png) => "image/png",
        Some(ImageFormat::Gif) => "image/gif",
        Some(ImageFormat::WebP) => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::new_rgb8(width, height);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}
