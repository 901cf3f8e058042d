use std::{
    io::SeekFrom,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::Local;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
    sync::Mutex,
};

#[derive(Debug, Clone)]
enum Sink {
    File {
        file: Arc<Mutex<File>>,
        path: PathBuf,
    },
    Console,
    Null,
}

/// Handle passed to every component that reports progress.
///
/// Cloning is cheap: file sinks share one handle behind a mutex so lines
/// from concurrent dispatches never interleave mid-line.
#[derive(Debug, Clone)]
pub struct Logger {
    sink: Sink,
    color_enable: bool,
}

const RESET: &str = "\x1b[0m";
const BG_BLUE: &str = "\x1b[44m"; // info
const BG_ORANGE: &str = "\x1b[48;5;208m"; // warning
const BG_RED: &str = "\x1b[41m";
const BG_GREEN: &str = "\x1b[42m"; // push ok
const BG_MAGENTA: &str = "\x1b[45m"; // push fail
const FG_BOLD_WHITE: &str = "\x1b[97;1m";

const TAIL_CHUNK: usize = 8192;

impl Logger {
    pub async fn new(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .await?;
        Ok(Self {
            sink: Sink::File {
                file: Arc::new(Mutex::new(file)),
                path: path.to_path_buf(),
            },
            color_enable: color_from_env(),
        })
    }

    /// File logger, or the console when the file cannot be opened.
    pub async fn file_or_console(path: &Path) -> Self {
        match Logger::new(path).await {
            Ok(logger) => logger,
            Err(e) => {
                eprintln!("⚠ cannot open log file {}: {e}", path.display());
                Logger::console()
            }
        }
    }

    pub fn console() -> Self {
        Self {
            sink: Sink::Console,
            color_enable: color_from_env(),
        }
    }

    pub fn placeholder() -> Logger {
        Logger {
            sink: Sink::Null,
            color_enable: false,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.sink {
            Sink::File { path, .. } => Some(path),
            _ => None,
        }
    }

    fn paint_level(&self, level: &str) -> String {
        if !self.color_enable {
            return level.to_string();
        }
        match level {
            "INFO" => format!("{BG_BLUE}{FG_BOLD_WHITE} {level} {RESET}"),
            "WARNING" => format!("{BG_ORANGE}{FG_BOLD_WHITE} {level} {RESET}"),
            "ERROR" => format!("{BG_RED}{FG_BOLD_WHITE} {level} {RESET}"),
            "PUSH OK" => format!("{BG_GREEN}{FG_BOLD_WHITE} {level} {RESET}"),
            "PUSH FAIL" => format!("{BG_MAGENTA}{FG_BOLD_WHITE} {level} {RESET}"),
            _ => level.to_string(),
        }
    }

    fn format_line(&self, level: &str, msg: &str) -> String {
        let now = Local::now();
        format!(
            "[{}] {}: {}\n",
            now.format("%Y-%m-%d %H:%M:%S"),
            self.paint_level(level),
            msg
        )
    }

    pub async fn try_log(&self, level: &str, msg: &str) -> anyhow::Result<()> {
        match &self.sink {
            Sink::File { file, .. } => {
                let line = self.format_line(level, msg);
                let mut f = file.lock().await;
                f.write_all(line.as_bytes()).await?;
                f.flush().await?;
            }
            Sink::Console => eprint!("{}", self.format_line(level, msg)),
            Sink::Null => {}
        }
        Ok(())
    }

    /// Never fails: a sink that cannot be written falls back to stderr.
    pub async fn log(&self, level: &str, msg: &str) {
        if let Err(e) = self.try_log(level, msg).await {
            eprintln!("[log write failed: {e}] {level}: {msg}");
        }
    }

    pub async fn info(&self, msg: &str) {
        self.log("INFO", msg).await
    }

    pub async fn warning(&self, msg: &str) {
        self.log("WARNING", msg).await
    }

    pub async fn error(&self, msg: &str) {
        self.log("ERROR", msg).await
    }

    pub async fn push_ok(&self, msg: &str) {
        self.log("PUSH OK", msg).await
    }

    pub async fn push_fail(&self, msg: &str) {
        self.log("PUSH FAIL", msg).await
    }

    /// Reads the last `n` non-empty lines of a log file, oldest first.
    pub async fn tail(path: &Path, n: usize) -> anyhow::Result<Vec<String>> {
        if !tokio::fs::try_exists(path).await? {
            return Err(anyhow::anyhow!(
                "Failed to find log file {}",
                path.display()
            ));
        }

        let mut file = File::open(path).await?;
        let file_size = file.metadata().await?.len();

        let mut buffer = vec![0; TAIL_CHUNK];
        let mut collected = Vec::new();
        // bytes of a line whose start lies in a chunk not read yet
        let mut carry: Vec<u8> = Vec::new();

        let mut pos = file_size;

        while pos > 0 && collected.len() < n {
            let read_size = (buffer.len() as u64).min(pos) as usize;
            pos -= read_size as u64;

            file.seek(SeekFrom::Start(pos)).await?;
            file.read_exact(&mut buffer[..read_size]).await?;

            let mut combined = buffer[..read_size].to_vec();
            combined.extend_from_slice(&carry);
            let mut parts = combined.split(|b| *b == b'\n');

            // first piece may continue in the chunk before this one
            carry = parts.next().unwrap_or_default().to_vec();

            for line in parts.rev() {
                if !line.is_empty() {
                    collected.push(String::from_utf8_lossy(line).into_owned());
                    if collected.len() >= n {
                        break;
                    }
                }
            }
        }

        if !carry.is_empty() && collected.len() < n {
            collected.push(String::from_utf8_lossy(&carry).into_owned());
        }

        collected.reverse();
        Ok(collected)
    }
}

fn color_from_env() -> bool {
    std::env::var("JROCKET_NO_COLOR").ok().as_deref() != Some("1")
}
