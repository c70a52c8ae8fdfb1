// 该文件是 FruitCam （果镜） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::{
  fs::{File, OpenOptions},
  io::{ErrorKind, Write},
  path::{Path, PathBuf},
  sync::atomic::{AtomicU16, Ordering},
};

use chrono::{Datelike, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  FromUrl, FromUrlWithScheme, classifier::Prediction, frame::RawImage, model::WithLabel,
  output::Render, url_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("同一秒内的记录编号已用尽: {0}")]
  FrameIdExhausted(PathBuf),
}

/// 结果记录中标签的写法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
  Name,
  Id,
}

impl Record {
  pub fn record<T: WithLabel, W: Write>(
    &self,
    result: &Prediction<T>,
    mut writer: W,
  ) -> Result<(), DirectoryRecordOutputError> {
    let label = match (self, result.result.label()) {
      (Record::Name, Some(label)) => json!(label.to_label_str()),
      (Record::Id, Some(label)) => json!(label.to_label_id()),
      (_, None) => serde_json::Value::Null,
    };

    let record = json!({
      "result": result.result.to_string(),
      "label": label,
      "recognized": result.result.is_recognized(),
      "confidences": result.confidences.as_deref(),
    });

    serde_json::to_writer_pretty(&mut writer, &record)?;
    writer.flush()?;
    Ok(())
  }
}

/// 按日期分目录保存缩略图与结果记录
///
/// 默认只记录识别成功的结果，`?always` 时全部记录；
/// `?record=id` 以类别编号记录标签。记录名以 `.json` 文件独占创建，
/// 多个进程写同一目录时不会互相覆盖。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  record: Record,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let record = match uri.query_pairs().find(|(k, _)| k == "record") {
      Some((_, v)) if v == "id" => Record::Id,
      _ => Record::Name,
    };

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: url_path(uri),
      record,
      frame_counter: AtomicU16::new(0),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  /// 占用一个尚未使用的记录名，返回图片路径和已创建的记录文件
  fn claim_frame(&self) -> Result<(PathBuf, File), DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    let stamp = now.format("%H-%M-%S").to_string();
    for _ in 0..=u16::MAX {
      let path = directory.join(format!("{}-{:04X}.png", stamp, self.frame_id()));
      match OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path.with_extension("json"))
      {
        Ok(sidecar) => return Ok((path, sidecar)),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
          debug!("记录名已被占用: {}", path.display());
        }
        Err(e) => return Err(e.into()),
      }
    }

    Err(DirectoryRecordOutputError::FrameIdExhausted(directory.join(stamp)))
  }

  // 任一文件写入失败时两个文件都不保留
  fn write_frame<T: WithLabel>(
    &self,
    path: &Path,
    sidecar: File,
    frame: &RawImage,
    result: &Prediction<T>,
  ) -> Result<(), DirectoryRecordOutputError> {
    let written = self
      .record
      .record(result, sidecar)
      .and_then(|()| frame.save(path).map_err(DirectoryRecordOutputError::from));

    if let Err(e) = written {
      warn!("记录写入失败, 清理 {}: {}", path.display(), e);
      for leftover in [path.with_extension("json"), path.to_path_buf()] {
        if let Err(err) = std::fs::remove_file(&leftover)
          && err.kind() != ErrorKind::NotFound
        {
          warn!("无法删除 {}: {}", leftover.display(), err);
        }
      }
      return Err(e);
    }

    Ok(())
  }
}

impl<T: WithLabel> Render<RawImage, Prediction<T>> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RawImage, result: &Prediction<T>) -> Result<(), Self::Error> {
    if !self.always && !result.result.is_recognized() {
      debug!("未识别的结果不记录");
      return Ok(());
    }

    let (path, sidecar) = self.claim_frame()?;
    self.write_frame(&path, sidecar, frame, result)?;
    debug!("记录结果到: {}", path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{decision::ClassificationResult, model::FruitLabel};
  use image::{ImageBuffer, Rgba};
  use tempfile::tempdir;
  use url::Url;

  fn folder_output(directory: &Path, query: &str) -> DirectoryRecordOutput {
    let url = Url::parse(&format!("folder://{}{}", directory.display(), query)).unwrap();
    DirectoryRecordOutput::from_url(&url).unwrap()
  }

  fn recorded_files(directory: &Path, extension: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![directory.to_path_buf()];
    while let Some(dir) = stack.pop() {
      let Ok(entries) = std::fs::read_dir(&dir) else {
        continue;
      };
      for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
          stack.push(path);
        } else if path.extension().is_some_and(|e| e == extension) {
          found.push(path);
        }
      }
    }
    found
  }

  fn thumbnail() -> RawImage {
    ImageBuffer::from_pixel(32, 32, Rgba([200, 100, 0, 255]))
  }

  fn orange() -> Prediction<FruitLabel> {
    Prediction {
      result: ClassificationResult::Label(FruitLabel::Orange),
      confidences: Some(vec![0.25, 0.125, 0.625].into()),
    }
  }

  #[test]
  fn records_recognized_result_with_sidecar() {
    let scratch = tempdir().unwrap();
    let output = folder_output(scratch.path(), "");
    output.render_result(&thumbnail(), &orange()).unwrap();

    assert_eq!(recorded_files(scratch.path(), "png").len(), 1);
    let sidecars = recorded_files(scratch.path(), "json");
    assert_eq!(sidecars.len(), 1);

    let text = std::fs::read_to_string(&sidecars[0]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["result"], "Orange");
    assert_eq!(value["label"], "Orange");
    assert_eq!(value["recognized"], true);
    assert_eq!(value["confidences"], json!([0.25, 0.125, 0.625]));
  }

  #[test]
  fn separate_runs_on_one_directory_keep_every_record() {
    let scratch = tempdir().unwrap();
    let first = folder_output(scratch.path(), "");
    let second = folder_output(scratch.path(), "");

    first.render_result(&thumbnail(), &orange()).unwrap();
    second.render_result(&thumbnail(), &orange()).unwrap();
    first.render_result(&thumbnail(), &orange()).unwrap();

    let pngs = recorded_files(scratch.path(), "png");
    assert_eq!(pngs.len(), 3);
    assert_eq!(recorded_files(scratch.path(), "json").len(), 3);
    for png in pngs {
      assert!(png.with_extension("json").is_file());
    }
  }

  #[test]
  fn failed_frame_leaves_no_partial_record() {
    let scratch = tempdir().unwrap();
    let output = folder_output(scratch.path(), "");

    // 目标位置是目录，图片无法写入
    let path = scratch.path().join("frame.png");
    std::fs::create_dir(&path).unwrap();
    let sidecar = File::create(path.with_extension("json")).unwrap();

    let err = output
      .write_frame(&path, sidecar, &thumbnail(), &orange())
      .unwrap_err();
    assert!(matches!(err, DirectoryRecordOutputError::ImageError(_)));
    assert!(!path.with_extension("json").exists());
    assert!(path.is_dir());
  }

  #[test]
  fn skips_unrecognized_unless_always() {
    let unrecognized: Prediction<FruitLabel> = Prediction {
      result: ClassificationResult::Unrecognized,
      confidences: None,
    };

    let scratch = tempdir().unwrap();
    let output = folder_output(scratch.path(), "");
    output.render_result(&thumbnail(), &unrecognized).unwrap();
    assert!(recorded_files(scratch.path(), "png").is_empty());

    let scratch = tempdir().unwrap();
    let output = folder_output(scratch.path(), "?always&record=id");
    output.render_result(&thumbnail(), &unrecognized).unwrap();
    let sidecars = recorded_files(scratch.path(), "json");
    assert_eq!(sidecars.len(), 1);

    let text = std::fs::read_to_string(&sidecars[0]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["result"], "Can't recognize");
    assert!(value["label"].is_null());
    assert!(value["confidences"].is_null());
  }

  #[test]
  fn record_by_id_writes_label_index() {
    let prediction = Prediction {
      result: ClassificationResult::Label(FruitLabel::Banana),
      confidences: Some(vec![0.0, 1.0, 0.0].into()),
    };
    let mut buffer = Vec::new();
    Record::Id.record(&prediction, &mut buffer).unwrap();

    let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
    assert_eq!(value["label"], 1);
    assert_eq!(value["recognized"], true);
  }
}
