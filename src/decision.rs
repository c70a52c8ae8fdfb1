// 该文件是 FruitCam （果镜） 项目的一部分。
// src/decision.rs - 置信度阈值决策
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

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::model::WithLabel;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;
pub const UNRECOGNIZED_TEXT: &str = "Can't recognize";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationResult<T> {
  Label(T),
  Unrecognized,
}

impl<T> ClassificationResult<T> {
  pub fn label(&self) -> Option<&T> {
    match self {
      ClassificationResult::Label(label) => Some(label),
      ClassificationResult::Unrecognized => None,
    }
  }

  pub fn is_recognized(&self) -> bool {
    matches!(self, ClassificationResult::Label(_))
  }
}

impl<T: WithLabel> fmt::Display for ClassificationResult<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ClassificationResult::Label(label) => f.write_str(&label.to_label_str()),
      ClassificationResult::Unrecognized => f.write_str(UNRECOGNIZED_TEXT),
    }
  }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecisionError {
  #[error("标签索引越界: 索引 {index}, 标签数量 {labels}")]
  LabelIndexOutOfRange { index: usize, labels: usize },
}

/// 取最大置信度对应的标签，低于阈值时判定为无法识别
#[derive(Debug, Clone)]
pub struct DecisionPolicy<T> {
  labels: Box<[T]>,
  threshold: f32,
}

impl<T: Clone> DecisionPolicy<T> {
  pub fn new(labels: impl Into<Box<[T]>>) -> Self {
    Self {
      labels: labels.into(),
      threshold: DEFAULT_CONFIDENCE_THRESHOLD,
    }
  }

  pub fn with_threshold(mut self, threshold: f32) -> Self {
    self.threshold = threshold;
    self
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  pub fn labels(&self) -> &[T] {
    &self.labels
  }

  /// 阈值为闭区间（`>=`）；多个最大值相同时取第一个。
  ///
  /// 空向量视为无法识别。向量长度与标签数量不一致说明模型与标签配置
  /// 不匹配，返回 [`DecisionError::LabelIndexOutOfRange`]。
  pub fn decide(&self, confidences: &[f32]) -> Result<ClassificationResult<T>, DecisionError> {
    let Some((index, score)) = argmax(confidences) else {
      debug!("置信度向量为空");
      return Ok(ClassificationResult::Unrecognized);
    };

    if confidences.len() != self.labels.len() {
      return Err(DecisionError::LabelIndexOutOfRange {
        index: confidences.len().min(self.labels.len()),
        labels: self.labels.len(),
      });
    }

    let label = self
      .labels
      .get(index)
      .ok_or(DecisionError::LabelIndexOutOfRange {
        index,
        labels: self.labels.len(),
      })?;

    debug!("最大置信度: {:.4}, 索引: {}, 阈值: {}", score, index, self.threshold);

    if score >= self.threshold {
      Ok(ClassificationResult::Label(label.clone()))
    } else {
      Ok(ClassificationResult::Unrecognized)
    }
  }
}

fn argmax(values: &[f32]) -> Option<(usize, f32)> {
  let (first, rest) = values.split_first()?;
  let mut best = (0, *first);
  for (i, &value) in rest.iter().enumerate() {
    if value > best.1 {
      best = (i + 1, value);
    }
  }
  Some(best)
}
