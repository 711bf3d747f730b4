//! JSON Lines 编解码
//!
//! 每行一个 JSON 对象，空行和 `#` 开头的注释行会被跳过。
//! 用于离线回放扫描数据以及输出速度指令。
//!
//! ```text
//! {"ranges":[1.0,1.2,null,0.9],"range_min":0.12,"range_max":8.0,"stamp":0.1}
//! ```

use crate::{ProtocolError, RangeScan, VelocityCommand};
use std::io::BufRead;

/// 解码单行扫描
///
/// `line_no` 从 1 开始，只用于错误信息。解码后会校验扫描头部参数。
pub fn decode_scan_line(line: &str, line_no: usize) -> Result<RangeScan, ProtocolError> {
    let scan: RangeScan =
        serde_json::from_str(line).map_err(|e| ProtocolError::ParseError {
            line: line_no,
            message: e.to_string(),
        })?;
    scan.validate()?;
    Ok(scan)
}

/// 编码单条扫描（不含换行符）
pub fn encode_scan_line(scan: &RangeScan) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(scan)?)
}

/// 编码单条速度指令（不含换行符）
pub fn encode_command_line(command: &VelocityCommand) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(command)?)
}

/// 逐行读取扫描的迭代器
///
/// # 示例
///
/// ```
/// use roamer_protocol::codec::ScanReader;
///
/// let input = "# recorded\n{\"ranges\":[1.0,null],\"range_min\":0.1,\"range_max\":8.0}\n";
/// let scans: Vec<_> = ScanReader::new(input.as_bytes()).collect();
/// assert_eq!(scans.len(), 1);
/// assert!(scans[0].as_ref().unwrap().ranges[1].is_nan());
/// ```
pub struct ScanReader<R> {
    reader: R,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> ScanReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }

    /// 最近读取的行号
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> Iterator for ScanReader<R> {
    type Item = Result<RangeScan, ProtocolError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    let line = self.buf.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    return Some(decode_scan_line(line, self.line_no));
                },
                Err(e) => return Some(Err(ProtocolError::Io(e))),
            }
        }
    }
}
