use std::io::{ErrorKind, Read};

/// Where utterances come from. The stdin source is the seam a transcriber
/// plugs into: anything that yields one utterance at a time.
pub trait UtteranceSource {
    /// Feed utterances to `handler` until the source is exhausted, the user
    /// says an exit phrase, or `handler` fails.
    fn listen(&mut self, handler: &mut dyn FnMut(&str) -> anyhow::Result<()>) -> anyhow::Result<()>;
}

const EXIT_PHRASES: &[&str] = &["exit", "quit", "stop listening"];

/// One utterance per line.
///
/// Lines are read a byte at a time with no read-ahead, so input the loop has
/// not reached yet stays in the file descriptor. An exec restart hands that
/// descriptor to the new process image and the queued lines are handled
/// there.
pub struct LineSource<R> {
    reader: R,
}

#[cfg(unix)]
pub type StdinReader = std::fs::File;
#[cfg(not(unix))]
pub type StdinReader = std::io::Stdin;

impl LineSource<StdinReader> {
    /// Unbuffered stdin. `std::io::Stdin` keeps its own read-ahead buffer,
    /// so on unix the descriptor is duplicated and read directly.
    #[cfg(unix)]
    pub fn stdin() -> anyhow::Result<Self> {
        use std::os::fd::AsFd;
        let fd = std::io::stdin().as_fd().try_clone_to_owned()?;
        Ok(Self::new(std::fs::File::from(fd)))
    }

    #[cfg(not(unix))]
    pub fn stdin() -> anyhow::Result<Self> {
        Ok(Self::new(std::io::stdin()))
    }
}

impl<R: Read> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// The next line without its terminator, or `None` at end of input.
    fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) if line.is_empty() => return Ok(None),
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => line.push(byte[0]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

impl<R: Read> UtteranceSource for LineSource<R> {
    fn listen(&mut self, handler: &mut dyn FnMut(&str) -> anyhow::Result<()>) -> anyhow::Result<()> {
        while let Some(line) = self.next_line()? {
            let utterance = line.trim();
            if utterance.is_empty() {
                continue;
            }
            if EXIT_PHRASES.contains(&utterance.to_lowercase().as_str()) {
                tracing::info!("exit requested");
                return Ok(());
            }
            handler(utterance)?;
        }
        tracing::debug!("input closed");
        Ok(())
    }
}
