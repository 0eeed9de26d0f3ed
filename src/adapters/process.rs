use crate::domain::model::{CommandOutput, CommandSpec};
use crate::domain::ports::CommandRunner;
use crate::utils::error::{Result, SetupError};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;

/// 以 tokio::process 執行外部指令
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let argv = spec.argv();
        let (program, args) = argv.split_first().ok_or_else(|| SetupError::ContextError {
            message: "empty command".to_string(),
        })?;

        tracing::debug!("▶️ {}", spec.display());

        let mut command = Command::new(program);
        command.args(args);
        if !spec.privileged {
            command.envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }
        command
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn()?;

        if let Some(input) = &spec.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes()).await?;
                // 關閉 stdin 讓子行程讀到 EOF
                drop(stdin);
            }
        }

        let result = if spec.streamed {
            let stdout = child.stdout.take();
            let stderr = child.stderr.take();
            let (stdout, stderr, status) =
                tokio::try_join!(stream_lines(stdout), stream_lines(stderr), child.wait())?;
            CommandOutput {
                code: status.code(),
                stdout,
                stderr,
            }
        } else {
            let output = child.wait_with_output().await?;
            CommandOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            }
        };

        if !result.success() {
            tracing::debug!(
                "Command `{}` exited with {:?}: {}",
                spec.display(),
                result.code,
                result.stderr.trim()
            );
        }

        Ok(result)
    }
}

/// 逐行轉寫到日誌，同時保留完整輸出
async fn stream_lines<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<String> {
    let mut collected = String::new();
    let Some(reader) = reader else {
        return Ok(collected);
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim_end();
        if !trimmed.is_empty() {
            tracing::info!("  │ {}", trimmed);
        }
        collected.push_str(&line);
    }
    Ok(collected)
}
