// 该文件是 FruitCam （果镜） 项目的一部分。
// src/classifier.rs - 预处理、推理与决策流水线
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

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  decision::{
    ClassificationResult, DEFAULT_CONFIDENCE_THRESHOLD, DecisionError, DecisionPolicy,
  },
  frame::{FRUIT_INPUT_SIZE, NormalizeError, PixelScale, RawImage, RgbNhwcTensor, thumbnail},
  input::Capture,
  model::{ConfidenceVector, FruitLabel, Model, ModelError, ModelLoader},
};

#[derive(Error, Debug)]
pub enum ClassifyError {
  #[error("图像预处理错误: {0}")]
  NormalizeError(#[from] NormalizeError),
  #[error("决策错误: {0}")]
  DecisionError(#[from] DecisionError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
  pub threshold: f32,
  pub pixel_scale: PixelScale,
}

impl Default for ClassifierConfig {
  fn default() -> Self {
    Self {
      threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      pixel_scale: PixelScale::default(),
    }
  }
}

/// 一次分类的结果，模型不可用时没有置信度
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction<T> {
  pub result: ClassificationResult<T>,
  pub confidences: Option<ConfidenceVector>,
}

/// 从一次采集得到缩略图和分类结果
pub trait Recognize {
  type Label;

  fn recognize(
    &self,
    capture: &Capture,
  ) -> Result<(RawImage, Prediction<Self::Label>), ClassifyError>;
}

pub struct Classifier<const S: u32, L, T> {
  loader: L,
  policy: DecisionPolicy<T>,
  pixel_scale: PixelScale,
}

pub type FruitClassifier<L> = Classifier<FRUIT_INPUT_SIZE, L, FruitLabel>;

impl<L> FruitClassifier<L> {
  pub fn fruit(loader: L, config: ClassifierConfig) -> Self {
    Classifier::new(
      loader,
      DecisionPolicy::new(FruitLabel::ALL).with_threshold(config.threshold),
      config.pixel_scale,
    )
  }
}

impl<const S: u32, L, T> Classifier<S, L, T> {
  pub fn new(loader: L, policy: DecisionPolicy<T>, pixel_scale: PixelScale) -> Self {
    Self {
      loader,
      policy,
      pixel_scale,
    }
  }

  pub fn policy(&self) -> &DecisionPolicy<T> {
    &self.policy
  }

  pub fn pixel_scale(&self) -> PixelScale {
    self.pixel_scale
  }
}

impl<const S: u32, L, T> Classifier<S, L, T>
where
  L: ModelLoader<Error = ModelError>,
  L::Model: Model<Input = RgbNhwcTensor<S>, Output = ConfidenceVector, Error = ModelError>,
  T: Clone,
{
  /// 对已缩放到 S×S 的缩略图分类
  ///
  /// 模型不可用时记录原因并返回无法识别；
  /// 预处理和标签配置错误直接返回。
  pub fn predict(&self, thumbnail: &RawImage) -> Result<Prediction<T>, ClassifyError> {
    let tensor = RgbNhwcTensor::<S>::normalize(thumbnail, self.pixel_scale)?;

    let confidences = match self.infer(&tensor) {
      Ok(confidences) => confidences,
      Err(e) => {
        warn!("模型推理失败, 判定为无法识别: {}", e);
        return Ok(Prediction {
          result: ClassificationResult::Unrecognized,
          confidences: None,
        });
      }
    };

    let result = self.policy.decide(&confidences)?;
    Ok(Prediction {
      result,
      confidences: Some(confidences),
    })
  }

  pub fn classify(&self, thumbnail: &RawImage) -> Result<ClassificationResult<T>, ClassifyError> {
    self.predict(thumbnail).map(|prediction| prediction.result)
  }

  // 模型句柄只在本次调用内存活
  fn infer(&self, tensor: &RgbNhwcTensor<S>) -> Result<ConfidenceVector, ModelError> {
    let model = self.loader.load()?;
    let now = std::time::Instant::now();
    let confidences = model.infer(tensor)?;
    debug!("推理耗时: {:.2?}", now.elapsed());
    Ok(confidences)
  }
}

impl<const S: u32, L, T> Recognize for Classifier<S, L, T>
where
  L: ModelLoader<Error = ModelError>,
  L::Model: Model<Input = RgbNhwcTensor<S>, Output = ConfidenceVector, Error = ModelError>,
  T: Clone,
{
  type Label = T;

  fn recognize(&self, capture: &Capture) -> Result<(RawImage, Prediction<T>), ClassifyError> {
    let thumbnail = thumbnail(&capture.image, capture.kind, S)?;
    info!(
      "生成缩略图: {}x{} -> {}x{}",
      capture.image.width(),
      capture.image.height(),
      S,
      S
    );
    let prediction = self.predict(&thumbnail)?;
    Ok((thumbnail, prediction))
  }
}
