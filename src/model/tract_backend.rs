// 该文件是 FruitCam （果镜） 项目的一部分。
// src/model/tract_backend.rs - 基于 tract 的 ONNX 推理
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

use tracing::{debug, error, info};
use tract_onnx::prelude::*;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNhwcTensor,
  model::{ConfidenceVector, Model, ModelError, ModelLoader},
  url_path,
};

type TractPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// 一次分类期间持有的模型句柄
pub struct TractModel<const S: u32> {
  plan: TractPlan,
  name: String,
}

pub struct TractModelBuilder<const S: u32> {
  model_path: PathBuf,
}

impl<const S: u32> FromUrlWithScheme for TractModelBuilder<S> {
  const SCHEME: &'static str = "onnx";
}

impl<const S: u32> FromUrl for TractModelBuilder<S> {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Ok(TractModelBuilder {
      model_path: url_path(url),
    })
  }
}

impl<const S: u32> TractModelBuilder<S> {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
    }
  }

  pub fn model_path(&self) -> &Path {
    &self.model_path
  }
}

impl<const S: u32> ModelLoader for TractModelBuilder<S> {
  type Model = TractModel<S>;
  type Error = ModelError;

  fn load(&self) -> Result<Self::Model, Self::Error> {
    let name = self.model_path.display().to_string();
    info!("加载模型文件: {}", name);

    let side = S as usize;
    let plan = tract_onnx::onnx()
      .model_for_path(&self.model_path)
      .and_then(|model| model.with_input_fact(0, f32::fact([1, side, side, 3]).into()))
      .and_then(|model| model.into_optimized())
      .and_then(|model| model.into_runnable())
      .map_err(|e| {
        error!("模型加载失败: {}: {:#}", name, e);
        ModelError::unavailable(name.as_str(), e)
      })?;

    debug!("模型加载完成, 输入形状: (1, {}, {}, 3)", side, side);
    Ok(TractModel { plan, name })
  }
}

impl<const S: u32> Model for TractModel<S> {
  type Input = RgbNhwcTensor<S>;
  type Output = ConfidenceVector;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let tensor = Tensor::from_shape(&input.shape(), input.as_nhwc())
      .map_err(|e| ModelError::unavailable(self.name.as_str(), e))?;

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(tensor.into_tvalue()))
      .map_err(|e| ModelError::unavailable(self.name.as_str(), e))?;

    let output = outputs
      .first()
      .ok_or_else(|| ModelError::unavailable(self.name.as_str(), "模型没有输出"))?;
    let view = output
      .to_array_view::<f32>()
      .map_err(|e| ModelError::unavailable(self.name.as_str(), e))?;

    let confidences: Vec<f32> = view.iter().copied().collect();
    debug!("模型推理结果: {:?}", confidences);

    Ok(ConfidenceVector::from(confidences))
  }
}

impl<const S: u32> Drop for TractModel<S> {
  fn drop(&mut self) {
    debug!("释放模型: {}", self.name);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::FRUIT_INPUT_SIZE;
  use std::io::Write;

  #[test]
  fn from_url_requires_onnx_scheme() {
    let url = Url::parse("yolo:///models/fruit.onnx").unwrap();
    let err = TractModelBuilder::<FRUIT_INPUT_SIZE>::from_url(&url)
      .err()
      .unwrap();
    assert!(matches!(err, ModelError::ModelPathError(_)));

    let url = Url::parse("onnx:///models/fruit%20v2.onnx").unwrap();
    let builder = TractModelBuilder::<FRUIT_INPUT_SIZE>::from_url(&url).unwrap();
    assert_eq!(builder.model_path(), Path::new("/models/fruit v2.onnx"));
  }

  #[test]
  fn corrupt_model_is_unavailable() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"not an onnx graph").unwrap();
    let builder = TractModelBuilder::<FRUIT_INPUT_SIZE>::new(file.path());
    let err = builder.load().err().unwrap();
    assert!(matches!(err, ModelError::ModelUnavailable { .. }));
  }

  #[test]
  fn missing_model_is_unavailable() {
    let scratch = tempfile::tempdir().unwrap();
    let builder = TractModelBuilder::<FRUIT_INPUT_SIZE>::new(scratch.path().join("fruit.onnx"));
    let err = builder.load().err().unwrap();
    assert!(matches!(err, ModelError::ModelUnavailable { .. }));
  }
}
