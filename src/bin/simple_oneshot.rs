// 该文件是 FruitCam （果镜） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图片识别
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use fruitcam::{
  FromUrl,
  classifier::{ClassifierConfig, FruitClassifier},
  decision::DEFAULT_CONFIDENCE_THRESHOLD,
  frame::{FRUIT_INPUT_SIZE, PixelScale},
  input::InputWrapper,
  model::TractModelBuilder,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};
use tracing::info;

/// FruitCam 单张图片识别
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型文件路径，例如 onnx:///models/fruit.onnx
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 image:///photo.jpg?capture=camera
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出方式：console:、image:///thumb.png 或 folder:///records
  #[arg(long, value_name = "OUTPUT", default_value = "console:")]
  pub output: Url,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
  pub threshold: f32,
  /// 像素缩放方式：raw (0-255) 或 unit (0-1)
  #[arg(long, value_name = "SCALE", default_value = "raw")]
  pub pixel_scale: PixelScale,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let loader = TractModelBuilder::<FRUIT_INPUT_SIZE>::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let config = ClassifierConfig {
    threshold: args.threshold,
    pixel_scale: args.pixel_scale,
  };
  let classifier = FruitClassifier::fruit(loader, config);
  info!(
    "分类标签: {:?}, 置信度阈值: {}, 像素缩放: {:?}",
    classifier.policy().labels(),
    classifier.policy().threshold(),
    classifier.pixel_scale()
  );

  OneShotTask.run_task(input, classifier, output)?;

  Ok(())
}
