// 该文件是 FruitCam （果镜） 项目的一部分。
// src/input/gallery_input.rs - 图库目录输入
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

use std::{collections::VecDeque, path::PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::CaptureKind, input::Capture, url_path};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum GalleryInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 图库目录，按文件名顺序逐张给出图片
pub struct GalleryInput {
  pending: VecDeque<PathBuf>,
}

impl FromUrlWithScheme for GalleryInput {
  const SCHEME: &'static str = "gallery";
}

impl FromUrl for GalleryInput {
  type Error = GalleryInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(GalleryInputError::SchemeMismatch);
    }

    let directory = url_path(url);
    let mut files = Vec::new();
    for entry in std::fs::read_dir(&directory)? {
      let path = entry?.path();
      if path.is_file() && is_image_file(&path) {
        files.push(path);
      }
    }
    files.sort();

    info!("图库目录 {} 中有 {} 张图片", directory.display(), files.len());

    Ok(GalleryInput {
      pending: files.into(),
    })
  }
}

impl GalleryInput {
  pub fn remaining(&self) -> usize {
    self.pending.len()
  }
}

fn is_image_file(path: &std::path::Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      let ext = ext.to_ascii_lowercase();
      IMAGE_EXTENSIONS.contains(&ext.as_str())
    })
    .unwrap_or(false)
}

impl Iterator for GalleryInput {
  type Item = Capture;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(path) = self.pending.pop_front() {
      let decoded = ImageReader::open(&path)
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode());
      match decoded {
        Ok(image) => {
          debug!("读取图库图片: {}", path.display());
          return Some(Capture::new(image, CaptureKind::Gallery).with_origin(path));
        }
        Err(e) => {
          warn!("跳过无法解码的图片 {}: {}", path.display(), e);
        }
      }
    }
    None
  }
}
