//! Running the verifier as a subprocess and capturing its output.

use crate::config::VerifierConfig;
use crate::error::{Result, VerifyError};
use crate::locator::ToolLocator;
use crate::platform::PlatformVariant;
use std::ffi::OsString;
use std::io::{self, ErrorKind, Read};
use std::mem;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Flag asking the Reference verifier for detailed diagnostics.
pub const VERBOSE_FLAG: &str = "/VERBOSE";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long stream readers get once the verifier is gone.
const READER_GRACE: Duration = Duration::from_millis(250);

/// Text encoding of the verifier's output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8, used by the Alternate verifier
    Utf8,
    /// Little-endian UTF-16, used by the Reference verifier
    Utf16Le,
}

impl TextEncoding {
    /// Fixed encoding policy per platform.
    pub fn for_platform(platform: PlatformVariant) -> Self {
        match platform {
            PlatformVariant::Alternate => Self::Utf8,
            PlatformVariant::Reference => Self::Utf16Le,
        }
    }

    /// Decodes raw stream bytes. A leading byte-order mark is dropped and
    /// invalid sequences become U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                String::from_utf8_lossy(bytes).into_owned()
            }
            Self::Utf16Le => {
                let bytes = bytes.strip_prefix(b"\xFF\xFE").unwrap_or(bytes);
                let chunks = bytes.chunks_exact(2);
                let trailing = !chunks.remainder().is_empty();
                let units: Vec<u16> = chunks
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                let mut text = String::from_utf16_lossy(&units);
                if trailing {
                    text.push(char::REPLACEMENT_CHARACTER);
                }
                text
            }
        }
    }
}

/// Command-line arguments for verifying `artifact` on `platform`.
pub fn verifier_arguments(artifact: &Path, platform: PlatformVariant) -> Vec<OsString> {
    let mut arguments = vec![artifact.as_os_str().to_owned()];
    if platform == PlatformVariant::Reference {
        arguments.push(OsString::from(VERBOSE_FLAG));
    }
    arguments
}

/// One completed verifier invocation.
#[derive(Debug, Clone)]
pub struct VerificationRun {
    /// Module that was verified
    pub artifact: PathBuf,
    /// Arguments passed to the verifier
    pub arguments: Vec<OsString>,
    /// Encoding used to decode the output
    pub encoding: TextEncoding,
    /// Decoded stdout followed by decoded stderr
    pub output: String,
    /// Exit code of the verifier
    pub exit_code: i32,
    /// Wall time of the run
    pub duration: Duration,
}

/// Something that can verify a module on disk.
pub trait VerifierRunner: Send + Sync {
    /// Verifies `artifact` once.
    ///
    /// # Errors
    /// Returns an error if the verifier cannot be found, started or waited on.
    fn run(&self, artifact: &Path, platform: PlatformVariant) -> Result<VerificationRun>;
}

/// Runs the real verifier executable.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    locator: Arc<ToolLocator>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ProcessInvoker {
    /// Invoker with no timeout running in the current directory.
    pub fn new(locator: Arc<ToolLocator>) -> Self {
        Self {
            locator,
            working_dir: None,
            timeout: None,
        }
    }

    /// Invoker using the timeout and working directory from config.
    pub fn from_config(locator: Arc<ToolLocator>, config: &VerifierConfig) -> Self {
        Self {
            locator,
            working_dir: config.working_dir.clone(),
            timeout: config.timeout(),
        }
    }

    /// Kills the verifier if it runs longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs the verifier from `working_dir`.
    #[must_use]
    pub fn with_working_dir(mut self, working_dir: PathBuf) -> Self {
        self.working_dir = Some(working_dir);
        self
    }
}

impl VerifierRunner for ProcessInvoker {
    fn run(&self, artifact: &Path, platform: PlatformVariant) -> Result<VerificationRun> {
        let tool = self.locator.resolve()?;
        let arguments = verifier_arguments(artifact, platform);
        let encoding = TextEncoding::for_platform(platform);

        let mut command = Command::new(&tool);
        command
            .args(&arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        hide_console(&mut command);

        tracing::debug!("Running verifier: {tool} {arguments:?} ({encoding:?})");
        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| VerifyError::Launch {
            tool: tool.as_path().to_path_buf(),
            source,
        })?;

        // Both pipes are drained while the child runs so neither can fill up.
        let mut capture = match OutputCapture::spawn(&mut child) {
            Ok(capture) => capture,
            Err(err) => {
                reap(&mut child);
                return Err(err.into());
            }
        };

        let deadline = self.timeout.and_then(|timeout| start.checked_add(timeout));
        let waited = wait_with_deadline(&mut child, deadline);
        if waited.is_err() {
            reap(&mut child);
        }
        let status = waited?;

        // Descendants of the verifier can keep the pipes open after it exits
        // or is killed, so the drain is bounded too.
        let drain_deadline = if status.is_some() {
            deadline.and_then(|deadline| deadline.max(Instant::now()).checked_add(READER_GRACE))
        } else {
            Instant::now().checked_add(READER_GRACE)
        };
        let drained = capture.drain(drain_deadline)?;
        let duration = start.elapsed();

        let (stdout, stderr) = capture.take();
        let mut output = encoding.decode(&stdout);
        output.push_str(&encoding.decode(&stderr));

        let timeout = self.timeout.unwrap_or_default();
        let Some(status) = status else {
            tracing::warn!("Verifier exceeded {timeout:?} on {}", artifact.display());
            return Err(VerifyError::Timeout { timeout, output });
        };
        if !drained {
            tracing::warn!(
                "Verifier exited but its output streams stayed open past {timeout:?} on {}",
                artifact.display()
            );
            return Err(VerifyError::Timeout { timeout, output });
        }

        let exit_code = exit_code(status);
        tracing::debug!(
            "Verifier exited with code {} after {:?} ({} bytes of output)",
            exit_code,
            duration,
            output.len()
        );

        Ok(VerificationRun {
            artifact: artifact.to_path_buf(),
            arguments,
            encoding,
            output,
            exit_code,
            duration,
        })
    }
}

/// Output collected by the two reader threads.
///
/// Readers append into shared buffers and report completion over a channel,
/// so a reader blocked on a pipe held open elsewhere can be left behind.
struct OutputCapture {
    stdout: Arc<Mutex<Vec<u8>>>,
    stderr: Arc<Mutex<Vec<u8>>>,
    finished: Receiver<io::Result<()>>,
    pending: usize,
}

impl OutputCapture {
    fn spawn(child: &mut Child) -> io::Result<Self> {
        let (done, finished) = mpsc::channel();
        let stdout = Arc::new(Mutex::new(Vec::new()));
        let stderr = Arc::new(Mutex::new(Vec::new()));
        spawn_reader(
            "verifier-stdout",
            child.stdout.take(),
            Arc::clone(&stdout),
            done.clone(),
        )?;
        spawn_reader("verifier-stderr", child.stderr.take(), Arc::clone(&stderr), done)?;
        Ok(Self {
            stdout,
            stderr,
            finished,
            pending: 2,
        })
    }

    /// Waits for both readers to reach end of stream. Returns `false` if
    /// `deadline` passed first.
    fn drain(&mut self, deadline: Option<Instant>) -> io::Result<bool> {
        while self.pending > 0 {
            let outcome = match deadline {
                None => self.finished.recv().map_err(|_| reader_lost())?,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match self.finished.recv_timeout(remaining) {
                        Ok(outcome) => outcome,
                        Err(RecvTimeoutError::Timeout) => return Ok(false),
                        Err(RecvTimeoutError::Disconnected) => return Err(reader_lost()),
                    }
                }
            };
            outcome?;
            self.pending -= 1;
        }
        Ok(true)
    }

    /// Everything read so far from stdout and stderr.
    fn take(&self) -> (Vec<u8>, Vec<u8>) {
        (
            mem::take(&mut *lock_buffer(&self.stdout)),
            mem::take(&mut *lock_buffer(&self.stderr)),
        )
    }
}

fn spawn_reader<R>(
    name: &str,
    stream: Option<R>,
    buffer: Arc<Mutex<Vec<u8>>>,
    done: Sender<io::Result<()>>,
) -> io::Result<()>
where
    R: Read + Send + 'static,
{
    let name = name.to_owned();
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            let outcome = stream.map_or(Ok(()), |mut stream| read_into(&mut stream, &buffer));
            if done.send(outcome).is_err() {
                tracing::trace!("{name} finished after the run was abandoned");
            }
        })
        .map(drop)
}

fn read_into<R: Read>(stream: &mut R, buffer: &Mutex<Vec<u8>>) -> io::Result<()> {
    let mut chunk = [0_u8; 8192];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return Ok(()),
            Ok(read) => lock_buffer(buffer).extend_from_slice(&chunk[..read]),
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
}

fn lock_buffer(buffer: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

fn reader_lost() -> io::Error {
    io::Error::other("verifier output reader panicked")
}

/// Waits for exit, returning `None` if the child had to be killed.
fn wait_with_deadline(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            if let Err(err) = child.kill() {
                tracing::debug!("Failed to kill timed out verifier: {err}");
            }
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        tracing::debug!("Failed to kill verifier: {err}");
    }
    if let Err(err) = child.wait() {
        tracing::debug!("Failed to reap verifier: {err}");
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    -1
}

#[cfg(windows)]
fn hide_console(command: &mut Command) {
    use std::os::windows::process::CommandExt as _;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console(_command: &mut Command) {}
