// 该文件是 FruitCam （果镜） 项目的一部分。
// src/input.rs - 图像采集输入
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

use std::path::PathBuf;

use image::DynamicImage;
use thiserror::Error;

use crate::FromUrl;
pub use crate::frame::CaptureKind;

/// 一次拍摄或选择得到的图像，只会被处理一次
#[derive(Debug, Clone)]
pub struct Capture {
  pub image: DynamicImage,
  pub kind: CaptureKind,
  pub origin: Option<PathBuf>,
}

impl Capture {
  pub fn new(image: DynamicImage, kind: CaptureKind) -> Self {
    Self {
      image,
      kind,
      origin: None,
    }
  }

  pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
    self.origin = Some(origin.into());
    self
  }
}

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "gallery_input")]
mod gallery_input;
#[cfg(feature = "gallery_input")]
pub use self::gallery_input::{GalleryInput, GalleryInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "gallery_input")]
  #[error("Gallery input error: {0}")]
  GalleryInputError(#[from] GalleryInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
  #[cfg(feature = "gallery_input")]
  Gallery(GalleryInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    #[cfg(feature = "gallery_input")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == GalleryInput::SCHEME {
        let input = GalleryInput::from_url(url)?;
        return Ok(InputWrapper::Gallery(input));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl Iterator for InputWrapper {
  type Item = Capture;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.next(),
      #[cfg(feature = "gallery_input")]
      InputWrapper::Gallery(input) => input.next(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use url::Url;

  #[test]
  fn unknown_scheme_is_rejected() {
    let url = Url::parse("v4l2:///dev/video0").unwrap();
    assert!(matches!(
      InputWrapper::from_url(&url),
      Err(InputError::SchemeMismatch)
    ));
  }

  #[test]
  fn capture_defaults_to_no_origin() {
    let capture = Capture::new(DynamicImage::new_rgb8(4, 4), CaptureKind::Camera);
    assert!(capture.origin.is_none());
    let capture = capture.with_origin("/tmp/a.png");
    assert_eq!(capture.origin, Some(PathBuf::from("/tmp/a.png")));
  }
}
