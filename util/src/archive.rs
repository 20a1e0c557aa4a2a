//! Struct archiving functionality
//!
//! To add archiving functionality to a struct implement the `Archived` trait.
//! Records must be flat (no nested structs or sequences) so that they map onto
//! a single CSV row.
//!
//! Files are written by a background archive thread started with
//! [`spawn_writer`]. An [`Archiver`] only queues work for that thread, so
//! archiving never blocks the caller on disk I/O.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::fs::File;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use csv::WriterBuilder;
pub use csv::Writer;
use log::warn;
use serde::Serialize;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// Number of archivers created, used to give each one a unique ID.
static NUM_ARCHIVERS: AtomicUsize = AtomicUsize::new(0);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A record on its way to the archive thread.
pub type Record = Box<dyn erased_serde::Serialize + Send>;

/// Handle used to queue work for the archive thread.
///
/// The thread exits once every sender (including those held by archivers)
/// has been dropped and the queue has been written out.
#[derive(Clone)]
pub struct ArchiveSender {
    tx: SyncSender<ArchiveCmd>
}

/// An object used to write CSV archive files.
#[derive(Default)]
pub struct Archiver {
    id: usize,

    sender: Option<ArchiveSender>,

    path: Option<PathBuf>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Work for the archive thread.
pub enum ArchiveCmd {
    /// Create (truncating) the file for an archiver.
    Create {
        id: usize,
        path: PathBuf,
        has_headers: bool
    },

    /// Append a record to an archiver's file.
    Write {
        id: usize,
        record: Record
    },

    /// Close an archiver's file.
    Close {
        id: usize
    }
}

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file {0:?}: {1}")]
    CreateError(PathBuf, std::io::Error),

    #[error("Cannot write the record: {0}")]
    WriteError(csv::Error),

    #[error("Cannot flush the archive: {0}")]
    FlushError(std::io::Error),

    #[error("The archiver has not been initialised")]
    NotInitialised,

    #[error("The archive queue is full, the record was dropped")]
    QueueFull,

    #[error("The archive thread has stopped")]
    WriterStopped,

    #[error("Cannot start the archive thread: {0}")]
    SpawnError(std::io::Error)
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a csv.
///
/// To implement this trait, the struct shall have an `Archiver` member which
/// shall be setup in the struct's `init` or `new` functions.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), ArchiveError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArchiveSender {
    /// Queue a command without blocking.
    pub fn send(&self, cmd: ArchiveCmd) -> Result<(), ArchiveError> {
        self.tx.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => ArchiveError::QueueFull,
            TrySendError::Disconnected(_) => ArchiveError::WriterStopped
        })
    }
}

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root. The file will have a header row.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session, sender: &ArchiveSender, path: P
    ) -> Result<Self, ArchiveError> {
        Self::create(sender, session.arch_root.join(path), true)
    }

    /// Create a new archiver writing to the given file.
    ///
    /// Any existing file at the path is truncated by the archive thread. If
    /// the file cannot be created the thread logs it and drops the records.
    pub fn create<P: AsRef<Path>>(
        sender: &ArchiveSender, path: P, has_headers: bool
    ) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();
        let id = NUM_ARCHIVERS.fetch_add(1, Ordering::Relaxed);

        sender.send(ArchiveCmd::Create {
            id,
            path: path.clone(),
            has_headers
        })?;

        Ok(Self {
            id,
            sender: Some(sender.clone()),
            path: Some(path)
        })
    }

    /// Path of the file being written, if initialised.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Queue a record for the archive.
    pub fn serialise<T: Serialize + Send + 'static>(
        &mut self, record: T
    ) -> Result<(), ArchiveError> {
        match self.sender {
            Some(ref s) => s.send(ArchiveCmd::Write {
                id: self.id,
                record: Box::new(record)
            }),
            None => Err(ArchiveError::NotInitialised)
        }
    }
}

impl Drop for Archiver {
    fn drop(&mut self) {
        if let Some(ref s) = self.sender {
            // If the queue is full the file is closed when the thread exits
            s.send(ArchiveCmd::Close { id: self.id }).ok();
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Start the archive thread, which can hold up to `queue_len` pending
/// commands.
///
/// Join the returned handle after dropping every sender to make sure all
/// queued records have reached the disk.
pub fn spawn_writer(
    queue_len: usize
) -> Result<(ArchiveSender, JoinHandle<()>), ArchiveError> {
    let (tx, rx) = sync_channel(queue_len);

    let handle = thread::Builder::new()
        .name("archive".into())
        .spawn(move || writer_thread(rx))
        .map_err(ArchiveError::SpawnError)?;

    Ok((ArchiveSender { tx }, handle))
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn writer_thread(rx: Receiver<ArchiveCmd>) {
    let mut writers: HashMap<usize, (PathBuf, Writer<File>)> = HashMap::new();

    for cmd in rx.iter() {
        match cmd {
            ArchiveCmd::Create { id, path, has_headers } => {
                match open_writer(&path, has_headers) {
                    Ok(w) => {
                        writers.insert(id, (path, w));
                    },
                    Err(e) => warn!("{}", e)
                }
            },
            ArchiveCmd::Write { id, record } => {
                // Records for files which could not be created were warned about on creation
                if let Some((path, w)) = writers.get_mut(&id) {
                    if let Err(e) = write_record(w, &*record) {
                        warn!("Could not archive to {:?}: {}", path, e);
                    }
                }
            },
            ArchiveCmd::Close { id } => {
                writers.remove(&id);
            }
        }
    }
}

fn open_writer(path: &Path, has_headers: bool) -> Result<Writer<File>, ArchiveError> {
    let file = File::create(path)
        .map_err(|e| ArchiveError::CreateError(path.to_path_buf(), e))?;

    Ok(WriterBuilder::new()
        .has_headers(has_headers)
        .from_writer(file))
}

/// Write one record, flushing so that the file is complete even if the
/// process is terminated.
fn write_record(
    w: &mut Writer<File>,
    record: &(dyn erased_serde::Serialize + Send)
) -> Result<(), ArchiveError> {
    w.serialize(record).map_err(ArchiveError::WriteError)?;
    w.flush().map_err(ArchiveError::FlushError)
}
