use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use log::{debug, warn};
use rand::Rng;
use tokio::fs::{File, OpenOptions};

const TEMP_PREFIX: &str = "accent-";
const CREATE_ATTEMPTS: usize = 4;

/// Audio containers the prediction service accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioExtension {
    Wav,
    Mp3,
}

impl AudioExtension {
    /// Classify a declared upload filename by its final extension, ignoring case.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension().and_then(OsStr::to_str)?;
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(AudioExtension::Wav),
            "mp3" => Some(AudioExtension::Mp3),
            _ => None,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            AudioExtension::Wav => ".wav",
            AudioExtension::Mp3 => ".mp3",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            AudioExtension::Wav => "audio/wav",
            AudioExtension::Mp3 => "audio/mpeg",
        }
    }
}

/// An uploaded audio file on disk, removed when the guard goes away.
#[derive(Debug)]
pub struct TempAudioFile {
    path: PathBuf,
    removed: bool,
}

impl TempAudioFile {
    /// Allocate a fresh, randomly named file in `dir` and open it for writing.
    pub async fn create(dir: &Path, extension: AudioExtension) -> io::Result<(Self, File)> {
        let mut last_err = None;
        for _ in 0..CREATE_ATTEMPTS {
            let path = dir.join(format!("{}{}{}", TEMP_PREFIX, random_token(), extension.suffix()));
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => {
                    debug!("Created temporary audio file {}", path.display());
                    let guard = TempAudioFile { path, removed: false };
                    return Ok((guard, file));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::AlreadyExists, "temporary name collision")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file. Safe to call more than once; a file that is already
    /// gone is not an error.
    pub fn cleanup(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary audio file {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove temporary audio file {}: {}", self.path.display(), e),
        }
    }
}

impl Drop for TempAudioFile {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn random_token() -> String {
    format!("{:032x}", rand::thread_rng().gen::<u128>())
}
