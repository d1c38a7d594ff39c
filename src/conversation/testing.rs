//! In-memory transport and generator for conversation tests

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use super::Conversation;
use crate::chat::{ChatId, ChatTransport, PhotoVariant, ReplyKeyboard};
use crate::error::{GenerationError, TelegramError};
use crate::images::{ImageGenerator, ImageOutput, OutputStore, ReferenceStore};
use crate::prompt::PredictionInput;
use crate::session::SessionStore;

/// Something the bot sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text {
        chat_id: ChatId,
        text: String,
        keyboard: Option<ReplyKeyboard>,
    },
    Photo {
        chat_id: ChatId,
        path: PathBuf,
    },
}

#[derive(Debug, Default)]
pub struct FakeTransport {
    sent: Mutex<Vec<Sent>>,
    downloads: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                Sent::Photo { .. } => None,
            })
            .collect()
    }

    pub fn texts_for(&self, chat: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { chat_id, text, .. } if chat_id == chat => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn photos(&self) -> Vec<PathBuf> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Photo { path, .. } => Some(path),
                Sent::Text { .. } => None,
            })
            .collect()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&ReplyKeyboard>,
    ) -> Result<(), TelegramError> {
        self.sent.lock().unwrap().push(Sent::Text {
            chat_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn send_photo(&self, chat_id: ChatId, path: &Path) -> Result<(), TelegramError> {
        self.sent.lock().unwrap().push(Sent::Photo {
            chat_id,
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<(), TelegramError> {
        self.downloads.lock().unwrap().push(file_id.to_string());
        tokio::fs::write(dest, b"reference-bytes").await?;
        Ok(())
    }
}

/// Generator returning `outputs` images, or failing every run or read
#[derive(Debug, Default)]
pub struct FakeGenerator {
    outputs: usize,
    fail: bool,
    fail_read: bool,
    inputs: Mutex<Vec<PredictionInput>>,
}

impl FakeGenerator {
    pub fn inputs(&self) -> Vec<PredictionInput> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn run(&self, input: &PredictionInput) -> Result<Vec<ImageOutput>, GenerationError> {
        self.inputs.lock().unwrap().push(input.clone());
        if self.fail {
            return Err(GenerationError::Failed("backend exploded".to_string()));
        }
        Ok((0..self.outputs)
            .map(|i| ImageOutput {
                url: format!("mem://out-{}", i),
            })
            .collect())
    }

    async fn read(&self, output: ImageOutput) -> Result<Vec<u8>, GenerationError> {
        if self.fail_read {
            return Err(GenerationError::Failed(format!("lost {}", output.url)));
        }
        Ok(format!("bytes of {}", output.url).into_bytes())
    }
}

/// A photo message offering two sizes; "big" is the larger
pub fn photo() -> Vec<PhotoVariant> {
    vec![
        PhotoVariant {
            file_id: "small".to_string(),
            width: 90,
            height: 90,
            file_size: Some(2_000),
        },
        PhotoVariant {
            file_id: "big".to_string(),
            width: 1024,
            height: 1024,
            file_size: Some(150_000),
        },
    ]
}

/// A conversation wired to fakes and a temporary data directory
pub struct Fixture {
    pub conversation: Arc<Conversation<FakeTransport, FakeGenerator>>,
    pub transport: Arc<FakeTransport>,
    pub generator: Arc<FakeGenerator>,
    pub sessions: Arc<SessionStore>,
    pub references: ReferenceStore,
    pub outputs: OutputStore,
    _dir: TempDir,
}

impl Fixture {
    pub fn new(outputs: usize) -> Self {
        Self::with_generator(FakeGenerator {
            outputs,
            ..Default::default()
        })
    }

    pub fn failing() -> Self {
        Self::with_generator(FakeGenerator {
            fail: true,
            ..Default::default()
        })
    }

    /// Runs succeed but no output can be downloaded
    pub fn failing_reads(outputs: usize) -> Self {
        Self::with_generator(FakeGenerator {
            outputs,
            fail_read: true,
            ..Default::default()
        })
    }

    fn with_generator(generator: FakeGenerator) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let references = ReferenceStore::new(dir.path().join("references"));
        let outputs = OutputStore::new(dir.path().join("generated"));
        std::fs::create_dir_all(references.dir()).unwrap();
        std::fs::create_dir_all(outputs.dir()).unwrap();

        let transport = Arc::new(FakeTransport::default());
        let generator = Arc::new(generator);
        let sessions = Arc::new(SessionStore::new());
        let conversation = Arc::new(Conversation::new(
            transport.clone(),
            generator.clone(),
            sessions.clone(),
            references.clone(),
            outputs.clone(),
            2,
        ));

        Self {
            conversation,
            transport,
            generator,
            sessions,
            references,
            outputs,
            _dir: dir,
        }
    }

    /// Number of files in the generated directory
    pub fn generated_files(&self) -> usize {
        std::fs::read_dir(self.outputs.dir()).unwrap().count()
    }
}
