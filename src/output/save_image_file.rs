// 该文件是 FruitCam （果镜） 项目的一部分。
// src/output/save_image_file.rs - 保存缩略图文件
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

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, classifier::Prediction, frame::RawImage, model::WithLabel,
  output::Render, url_path,
};

/// 保存被分类的缩略图，`?size=N` 将其放大到 N×N 便于查看
pub struct SaveImageFileOutput {
  path: PathBuf,
  size: Option<u32>,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无效的图像尺寸: {0}")]
  InvalidSize(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let size = match uri.query_pairs().find(|(k, _)| k == "size") {
      Some((_, v)) => match v.parse::<u32>() {
        Ok(size) if size > 0 => Some(size),
        _ => return Err(SaveImageFileError::InvalidSize(v.into_owned())),
      },
      None => None,
    };

    Ok(SaveImageFileOutput {
      path: url_path(uri),
      size,
    })
  }
}

impl SaveImageFileOutput {
  pub fn path(&self) -> &Path {
    &self.path
  }

  fn save_image(&self, image: &RawImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    let saved = match self.size {
      Some(size) => imageops::resize(image, size, size, FilterType::Nearest).save(&self.path),
      None => image.save(&self.path),
    };
    saved.map_err(SaveImageFileError::ImageError)?;

    warn!("保存缩略图到文件: {}", self.path.display());

    Ok(())
  }
}

impl<T: WithLabel> Render<RawImage, Prediction<T>> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &RawImage, result: &Prediction<T>) -> Result<(), Self::Error> {
    info!("识别结果: {}", result.result);
    self.save_image(frame)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{decision::ClassificationResult, model::FruitLabel};
  use image::{ImageBuffer, Rgba};
  use tempfile::tempdir;

  #[test]
  fn saves_upscaled_thumbnail() {
    let scratch = tempdir().unwrap();
    let path = scratch.path().join("thumbs").join("thumb.png");
    let url = Url::parse(&format!("image://{}?size=64", path.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(output.path(), path.as_path());

    let thumbnail: RawImage = ImageBuffer::from_pixel(32, 32, Rgba([9, 8, 7, 255]));
    let prediction = Prediction {
      result: ClassificationResult::Label(FruitLabel::Apple),
      confidences: Some(vec![0.9, 0.05, 0.05].into()),
    };
    output.render_result(&thumbnail, &prediction).unwrap();

    let saved = image::open(&path).unwrap().to_rgba8();
    assert_eq!(saved.dimensions(), (64, 64));
    assert_eq!(saved.get_pixel(63, 63).0, [9, 8, 7, 255]);
  }

  #[test]
  fn rejects_zero_size() {
    let url = Url::parse("image:///tmp/thumb.png?size=0").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::InvalidSize(_))
    ));
  }
}
