// 该文件是 FruitCam （果镜） 项目的一部分。
// src/frame.rs - 缩略图与 NHWC 张量定义
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

use std::str::FromStr;

use image::{DynamicImage, RgbaImage, imageops::FilterType};
use thiserror::Error;

const RGB_CHANNELS: usize = 3;

/// 模型输入的边长
pub const FRUIT_INPUT_SIZE: u32 = 32;

/// 采集得到的原始位图，每个像素 RGBA 各 8 位
pub type RawImage = RgbaImage;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NormalizeError {
  #[error("像素数量不匹配: 期望 {expected}, 实际 {actual}")]
  ShapeMismatch { expected: usize, actual: usize },
  #[error("图像为空: {width}x{height}")]
  EmptyImage { width: u32, height: u32 },
  #[error("未知的像素缩放方式: {0}")]
  UnknownPixelScale(String),
}

/// 像素值到浮点数的缩放方式
///
/// 随应用发布的模型直接使用 0-255 的原始强度，
/// 因此默认是 [`PixelScale::Raw`]；
/// 按 1/255 归一化训练的模型应选择 [`PixelScale::Unit`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelScale {
  #[default]
  Raw,
  Unit,
}

impl PixelScale {
  pub fn factor(self) -> f32 {
    match self {
      PixelScale::Raw => 1.0,
      PixelScale::Unit => 1.0 / 255.0,
    }
  }
}

impl FromStr for PixelScale {
  type Err = NormalizeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "raw" => Ok(PixelScale::Raw),
      "unit" => Ok(PixelScale::Unit),
      other => Err(NormalizeError::UnknownPixelScale(other.to_string())),
    }
  }
}

/// 图像的来源，决定缩略图的生成方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureKind {
  /// 相机拍摄：先居中裁剪为正方形再缩放
  Camera,
  /// 图库选择：直接缩放，不保持宽高比
  #[default]
  Gallery,
}

/// 将任意尺寸的采集图像缩小为 `side`x`side` 的缩略图
///
/// 缩放不做滤波（最近邻采样）。
pub fn thumbnail(
  image: &DynamicImage,
  kind: CaptureKind,
  side: u32,
) -> Result<RawImage, NormalizeError> {
  let (width, height) = (image.width(), image.height());
  if width == 0 || height == 0 {
    return Err(NormalizeError::EmptyImage { width, height });
  }

  let resized = match kind {
    CaptureKind::Camera => {
      let dimension = width.min(height);
      let x = (width - dimension) / 2;
      let y = (height - dimension) / 2;
      image
        .crop_imm(x, y, dimension, dimension)
        .resize_exact(side, side, FilterType::Nearest)
    }
    CaptureKind::Gallery => image.resize_exact(side, side, FilterType::Nearest),
  };

  Ok(resized.to_rgba8())
}

/// 形状为 (1, S, S, 3) 的 RGB 浮点张量，按行、列、通道顺序排列
#[derive(Debug, Clone, PartialEq)]
pub struct RgbNhwcTensor<const S: u32> {
  data: Box<[f32]>,
}

impl<const S: u32> RgbNhwcTensor<S> {
  const LEN: usize = RGB_CHANNELS * S as usize * S as usize;

  /// 将已缩放到 S×S 的图像填充为张量，忽略 alpha 通道
  pub fn normalize(image: &RawImage, scale: PixelScale) -> Result<Self, NormalizeError> {
    let expected = S as usize * S as usize;
    let actual = image.width() as usize * image.height() as usize;
    if actual != expected {
      return Err(NormalizeError::ShapeMismatch { expected, actual });
    }

    let factor = scale.factor();
    let mut data = Vec::with_capacity(Self::LEN);
    for pixel in image.pixels() {
      let [r, g, b, _] = pixel.0;
      data.push(r as f32 * factor);
      data.push(g as f32 * factor);
      data.push(b as f32 * factor);
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }

  pub fn shape(&self) -> [usize; 4] {
    [1, S as usize, S as usize, RGB_CHANNELS]
  }

  pub fn as_nhwc(&self) -> &[f32] {
    &self.data
  }

  pub fn get(&self, row: usize, col: usize, channel: usize) -> Option<f32> {
    if row >= S as usize || col >= S as usize || channel >= RGB_CHANNELS {
      return None;
    }
    let index = (row * S as usize + col) * RGB_CHANNELS + channel;
    self.data.get(index).copied()
  }
}

impl<const S: u32> TryFrom<Vec<f32>> for RgbNhwcTensor<S> {
  type Error = NormalizeError;

  fn try_from(data: Vec<f32>) -> Result<Self, Self::Error> {
    if data.len() != Self::LEN {
      return Err(NormalizeError::ShapeMismatch {
        expected: Self::LEN,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

pub type FruitTensor = RgbNhwcTensor<FRUIT_INPUT_SIZE>;
