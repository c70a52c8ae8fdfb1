// 该文件是 FruitCam （果镜） 项目的一部分。
// src/output/console_output.rs - 控制台结果输出
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

use std::io::Write;

use crate::{
  FromUrl, FromUrlWithScheme,
  classifier::Prediction,
  frame::RawImage,
  model::WithLabel,
  output::{OutputError, Render},
};

/// 在标准输出打印 `Result: <标签>`
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleOutput;

impl FromUrlWithScheme for ConsoleOutput {
  const SCHEME: &'static str = "console";
}

impl FromUrl for ConsoleOutput {
  type Error = OutputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }
    Ok(ConsoleOutput)
  }
}

impl ConsoleOutput {
  fn write_result<W: Write, T: WithLabel>(
    &self,
    writer: &mut W,
    result: &Prediction<T>,
  ) -> std::io::Result<()> {
    writeln!(writer, "Result: {}", result.result)
  }
}

impl<T: WithLabel> Render<RawImage, Prediction<T>> for ConsoleOutput {
  type Error = std::io::Error;

  fn render_result(&self, _frame: &RawImage, result: &Prediction<T>) -> Result<(), Self::Error> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    self.write_result(&mut handle, result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{decision::ClassificationResult, model::FruitLabel};

  #[test]
  fn prints_label_and_fallback() {
    let mut buffer = Vec::new();
    let recognized = Prediction {
      result: ClassificationResult::Label(FruitLabel::Orange),
      confidences: Some(vec![0.1, 0.1, 0.8].into()),
    };
    let unrecognized: Prediction<FruitLabel> = Prediction {
      result: ClassificationResult::Unrecognized,
      confidences: None,
    };

    ConsoleOutput.write_result(&mut buffer, &recognized).unwrap();
    ConsoleOutput.write_result(&mut buffer, &unrecognized).unwrap();
    assert_eq!(
      String::from_utf8(buffer).unwrap(),
      "Result: Orange\nResult: Can't recognize\n"
    );
  }
}
