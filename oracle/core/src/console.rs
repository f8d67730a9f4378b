//! Console I/O
//!
//! Line-based input and output shared by the terminal backend and the
//! console interlocutor. Both sides read from the same buffered input, so
//! they must share one [`Console`] (it is cheap to clone).
//!
//! Output goes through a [`Transcript`]-compatible writer so tests can read
//! back exactly what the user would have seen.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::session::Interlocutor;

type Input = Box<dyn AsyncBufRead + Unpin + Send>;
type Output = Box<dyn AsyncWrite + Unpin + Send>;

/// Shared line-oriented console
#[derive(Clone)]
pub struct Console {
    input: Arc<Mutex<Input>>,
    output: Arc<Mutex<Output>>,
}

impl Console {
    /// Console on the process's stdin/stdout
    #[must_use]
    pub fn stdio() -> Self {
        Self::from_parts(
            Box::new(BufReader::new(tokio::io::stdin())),
            Box::new(tokio::io::stdout()),
        )
    }

    /// Console on arbitrary reader/writer
    #[must_use]
    pub fn from_parts(input: Input, output: Output) -> Self {
        Self {
            input: Arc::new(Mutex::new(input)),
            output: Arc::new(Mutex::new(output)),
        }
    }

    /// Console fed from a fixed script, recording output into a transcript
    #[must_use]
    pub fn scripted(script: &str) -> (Self, Transcript) {
        let transcript = Transcript::default();
        let console = Self::from_parts(
            Box::new(io::Cursor::new(script.as_bytes().to_vec())),
            Box::new(transcript.clone()),
        );
        (console, transcript)
    }

    /// Write one line
    ///
    /// Output errors (closed stdout) are logged and otherwise ignored.
    pub async fn println(&self, line: &str) {
        self.write(&format!("{line}\n")).await;
    }

    /// Write a prompt without a trailing newline
    pub async fn print_prompt(&self, prompt: &str) {
        self.write(prompt).await;
    }

    async fn write(&self, text: &str) {
        let mut out = self.output.lock().await;
        let result = match out.write_all(text.as_bytes()).await {
            Ok(()) => out.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "Console write failed");
        }
    }

    /// Read one line without its terminator; `None` at end of input
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub async fn read_line(&self) -> io::Result<Option<String>> {
        let mut input = self.input.lock().await;
        let mut line = String::new();
        let n = input.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Print a prompt and read the answer
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    pub async fn ask(&self, prompt: &str) -> io::Result<Option<String>> {
        self.print_prompt(prompt).await;
        self.read_line().await
    }
}

/// In-memory output sink that can be read back
#[derive(Clone, Default)]
pub struct Transcript {
    buffer: Arc<parking_lot::Mutex<Vec<u8>>>,
}

impl Transcript {
    /// Everything written so far
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}

impl AsyncWrite for Transcript {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.buffer.lock().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Interlocutor that asks the user on the console
pub struct ConsoleInterlocutor {
    console: Console,
}

impl ConsoleInterlocutor {
    /// Create an interlocutor on a shared console
    #[must_use]
    pub fn new(console: Console) -> Self {
        Self { console }
    }
}

#[async_trait]
impl Interlocutor for ConsoleInterlocutor {
    async fn ready(&mut self) -> anyhow::Result<()> {
        self.console
            .ask("(Press Enter when you have your question in mind) > ")
            .await?;
        Ok(())
    }

    async fn topic(&mut self) -> anyhow::Result<String> {
        let answer = self
            .console
            .ask("(Enter the type of your question) > ")
            .await?;
        Ok(answer.unwrap_or_default().trim().to_string())
    }

    async fn detail(&mut self) -> anyhow::Result<Option<String>> {
        let answer = self
            .console
            .ask("(You may enter more details or press Enter to skip) > ")
            .await?;
        Ok(answer
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()))
    }

    async fn wants_another(&mut self) -> anyhow::Result<bool> {
        let answer = self.console.ask("(Enter yes or no) > ").await?;
        Ok(answer
            .map(|a| a.trim().to_ascii_lowercase().starts_with('y'))
            .unwrap_or(false))
    }
}
