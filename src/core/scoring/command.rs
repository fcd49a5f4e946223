//! 外部分类器进程
//!
//! 模型常驻在外部程序里（例如 Python 推理脚本），每帧调用一次：
//! `program [args...] <locator>`，stdout 第一行非空内容是 confidence。

use super::FrameScorer;
use crate::core::error::ScoreError;
use log::{debug, warn};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct CommandScorer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandScorer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// 单帧调用的时限，超时杀掉子进程
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn parse_output(stdout: &[u8]) -> Result<f32, ScoreError> {
        let text = String::from_utf8_lossy(stdout);
        let line = text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| ScoreError::Malformed("empty classifier output".into()))?;

        line.parse::<f32>()
            .map_err(|e| ScoreError::Malformed(format!("{:?}: {}", line, e)))
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default()
}

impl FrameScorer for CommandScorer {
    fn score(&self, locator: &str) -> Result<f32, ScoreError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(locator)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // 后台线程读管道，避免输出过多时子进程阻塞
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let started = Instant::now();
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    warn!(
                        "⏱️ Classifier {} timed out on {} after {:?}",
                        self.program, locator, self.timeout
                    );
                    return Err(ScoreError::TimedOut {
                        timeout_ms: self.timeout.as_millis() as u64,
                    });
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let stdout = collect(stdout);
        let stderr = collect(stderr);

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            warn!("⚠️ Classifier {} failed on {}: {}", self.program, locator, stderr.trim());
            return Err(ScoreError::Unavailable(format!(
                "{} exited with {}",
                self.program, status
            )));
        }

        let confidence = Self::parse_output(&stdout)?;
        debug!("{} -> {}", locator, confidence);
        Ok(confidence)
    }

    fn name(&self) -> &str {
        &self.program
    }
}
