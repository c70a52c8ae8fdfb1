// 该文件是 FruitCam （果镜） 项目的一部分。
// src/task.rs - 识别任务
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

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};
use tracing::{info, warn};

use crate::{
  classifier::{Prediction, Recognize},
  frame::RawImage,
  input::Capture,
  model::WithLabel,
  output::Render,
};

pub trait Task<I, C, O>: Sized {
  type Error;
  type Summary;
  fn run_task(self, input: I, classifier: C, output: O) -> Result<Self::Summary, Self::Error>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
  pub captures: usize,
  pub recognized: usize,
}

fn run_once<C, O, RE>(
  capture: &Capture,
  classifier: &C,
  output: &O,
) -> anyhow::Result<bool>
where
  C: Recognize,
  C::Label: WithLabel,
  O: Render<RawImage, Prediction<C::Label>, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  if let Some(origin) = &capture.origin {
    info!("处理图片: {}", origin.display());
  }
  let now = std::time::Instant::now();
  let (thumbnail, prediction) = classifier.recognize(capture)?;
  info!("识别结果: {}, 耗时: {:.2?}", prediction.result, now.elapsed());
  output.render_result(&thumbnail, &prediction)?;
  Ok(prediction.result.is_recognized())
}

/// 只处理第一张图片
pub struct OneShotTask;

impl<I, C, O, RE> Task<I, C, O> for OneShotTask
where
  I: Iterator<Item = Capture>,
  C: Recognize,
  C::Label: WithLabel,
  O: Render<RawImage, Prediction<C::Label>, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;
  type Summary = TaskSummary;

  fn run_task(self, mut input: I, classifier: C, output: O) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let capture = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图片"))?;
    let recognized = run_once(&capture, &classifier, &output)?;
    info!("任务完成");

    Ok(TaskSummary {
      captures: 1,
      recognized: recognized as usize,
    })
  }
}

/// 依次处理每张图片，每张只处理一次
#[derive(Default, Debug)]
pub struct ContinuousTask {
  capture_number: Option<usize>,
  interruptible: bool,
}

impl ContinuousTask {
  pub fn with_capture_number(mut self, capture_number: Option<usize>) -> Self {
    self.capture_number = capture_number;
    self
  }

  /// 安装 Ctrl-C 处理器，收到信号后处理完当前图片即退出
  pub fn interruptible(mut self, interruptible: bool) -> Self {
    self.interruptible = interruptible;
    self
  }
}

impl<I, C, O, RE> Task<I, C, O> for ContinuousTask
where
  I: Iterator<Item = Capture>,
  C: Recognize,
  C::Label: WithLabel,
  O: Render<RawImage, Prediction<C::Label>, Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
{
  type Error = anyhow::Error;
  type Summary = TaskSummary;

  fn run_task(self, input: I, classifier: C, output: O) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let stop = Arc::new(AtomicBool::new(false));

    if self.interruptible {
      let stop = stop.clone();
      ctrlc::set_handler(move || {
        info!("收到中断信号，处理完当前图片后退出...");
        stop.store(true, Ordering::SeqCst);
      })?;
    }

    let mut summary = TaskSummary::default();
    for capture in input {
      if stop.load(Ordering::SeqCst) {
        warn!("中断信号接收，退出任务循环");
        break;
      }

      summary.captures += 1;
      info!("处理第 {} 张图片", summary.captures);
      if run_once(&capture, &classifier, &output)? {
        summary.recognized += 1;
      }

      if self
        .capture_number
        .map(|n| summary.captures >= n)
        .unwrap_or(false)
      {
        info!("达到指定图片数 {}, 退出任务循环", summary.captures);
        break;
      }
    }

    info!(
      "任务完成，共处理 {} 张图片，识别 {} 张",
      summary.captures, summary.recognized
    );
    Ok(summary)
  }
}
