// 该文件是 FruitCam （果镜） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::ImageReader;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::CaptureKind, input::Capture, url_path};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("Unknown capture kind: {0}")]
  UnknownCaptureKind(String),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 单张图片输入，`?capture=camera` 表示这是一张相机照片
pub struct ImageFileInput {
  capture: Option<Capture>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let kind = match url.query_pairs().find(|(k, _)| k == "capture") {
      Some((_, v)) if v == "camera" => CaptureKind::Camera,
      Some((_, v)) if v == "gallery" => CaptureKind::Gallery,
      Some((_, v)) => return Err(ImageFileInputError::UnknownCaptureKind(v.into_owned())),
      None => CaptureKind::default(),
    };

    let path = url_path(url);
    let image = ImageReader::open(&path)?.decode()?;
    info!(
      "读取图片: {} ({}x{}, {:?})",
      path.display(),
      image.width(),
      image.height(),
      kind
    );

    Ok(ImageFileInput {
      capture: Some(Capture::new(image, kind).with_origin(path)),
    })
  }
}

impl Iterator for ImageFileInput {
  type Item = Capture;

  fn next(&mut self) -> Option<Self::Item> {
    self.capture.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};
  use tempfile::{Builder, NamedTempFile};

  fn write_image() -> NamedTempFile {
    let file = Builder::new().suffix(".png").tempfile().unwrap();
    RgbImage::from_pixel(8, 6, Rgb([1, 2, 3]))
      .save(file.path())
      .unwrap();
    file
  }

  #[test]
  fn reads_single_capture() {
    let file = write_image();
    let url = Url::parse(&format!("image://{}?capture=camera", file.path().display())).unwrap();

    let mut input = ImageFileInput::from_url(&url).unwrap();
    let capture = input.next().unwrap();
    assert_eq!(capture.kind, CaptureKind::Camera);
    assert_eq!((capture.image.width(), capture.image.height()), (8, 6));
    assert_eq!(capture.origin.as_deref(), Some(file.path()));
    assert!(input.next().is_none());
  }

  #[test]
  fn defaults_to_gallery() {
    let file = write_image();
    let url = Url::parse(&format!("image://{}", file.path().display())).unwrap();
    let capture = ImageFileInput::from_url(&url).unwrap().next().unwrap();
    assert_eq!(capture.kind, CaptureKind::Gallery);
  }

  #[test]
  fn rejects_unknown_capture_kind() {
    let file = write_image();
    let url = Url::parse(&format!("image://{}?capture=scanner", file.path().display())).unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::UnknownCaptureKind(_))
    ));
  }

  #[test]
  fn missing_file_is_io_error() {
    let url = Url::parse("image:///nonexistent/fruitcam/apple.png").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::IoError(_))
    ));
  }
}
