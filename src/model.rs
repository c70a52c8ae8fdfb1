// 该文件是 FruitCam （果镜） 项目的一部分。
// src/model.rs - 模型
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

use std::ops::Deref;

use thiserror::Error;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 每次分类时获取一个新的模型句柄，句柄在离开作用域时释放
pub trait ModelLoader {
  type Model: Model;
  type Error;

  fn load(&self) -> Result<Self::Model, Self::Error>;
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型不可用: {model}, 原因: {reason}")]
  ModelUnavailable { model: String, reason: String },
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl ModelError {
  pub fn unavailable(model: impl Into<String>, reason: impl std::fmt::Display) -> Self {
    ModelError::ModelUnavailable {
      model: model.into(),
      reason: format!("{:#}", reason),
    }
  }
}

/// 模型输出的各类别置信度，顺序与标签顺序一致
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfidenceVector(Box<[f32]>);

impl From<Vec<f32>> for ConfidenceVector {
  fn from(values: Vec<f32>) -> Self {
    ConfidenceVector(values.into_boxed_slice())
  }
}

impl Deref for ConfidenceVector {
  type Target = [f32];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

pub trait WithLabel: Sized + Clone + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> u32;
}

/// 水果类别，顺序必须与模型训练时的类别顺序一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FruitLabel {
  Apple,
  Banana,
  Orange,
}

impl FruitLabel {
  pub const ALL: [FruitLabel; 3] = [FruitLabel::Apple, FruitLabel::Banana, FruitLabel::Orange];
}

impl WithLabel for FruitLabel {
  fn to_label_str(&self) -> String {
    match self {
      FruitLabel::Apple => "Apple",
      FruitLabel::Banana => "Banana",
      FruitLabel::Orange => "Orange",
    }
    .to_string()
  }

  fn to_label_id(&self) -> u32 {
    *self as u32
  }
}

#[cfg(feature = "model_tract")]
mod tract_backend;
#[cfg(feature = "model_tract")]
pub use self::tract_backend::{TractModel, TractModelBuilder};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fruit_label_order_matches_ids() {
    for (index, label) in FruitLabel::ALL.iter().enumerate() {
      assert_eq!(label.to_label_id() as usize, index);
    }
    assert_eq!(FruitLabel::Banana.to_label_str(), "Banana");
  }

  #[test]
  fn unavailable_keeps_reason() {
    let err = ModelError::unavailable("fruit.onnx", "文件不存在");
    assert_eq!(err.to_string(), "模型不可用: fruit.onnx, 原因: 文件不存在");
  }
}
