//! In-memory workspace state and its synchronization with the store.
//!
//! [`Workspace`] owns the notes and files collections, the selection, the
//! current view and the search query. Every mutating operation rewrites the
//! affected collection through [`PersistentStore`].
//!
//! AI requests are split into `begin_*` / [`AiJob::run`] / `finish_*` so the
//! network round trip happens without borrowing the workspace. The
//! [`summarize_note`] and [`analyze_file`] helpers drive that protocol over a
//! [`SharedWorkspace`].
use std::{
    collections::HashSet,
    fs::File,
    io::Read,
    path::Path,
    sync::Arc,
};

use log::{debug, error, info, warn};
use tokio::sync::Mutex;

use crate::{
    guess_mime_type, AiFailure, AiService, FileItem, LuminaError, Note, NotePatch,
    PersistentStore, Result, ViewType, FILES_KEY, NOTES_KEY,
};

/// Workspace shared between the front-end, editor sessions and AI tasks
pub type SharedWorkspace = Arc<Mutex<Workspace>>;

pub struct Workspace {
    notes: Vec<Note>,
    files: Vec<FileItem>,
    active_note_id: Option<String>,
    view: ViewType,
    search_query: String,
    store: PersistentStore,
    ai: AiService,
    summarizing: HashSet<String>,
    analyzing: HashSet<String>,
}

impl Workspace {
    /// Loads both collections from `store`; unreadable data starts empty.
    pub fn load(store: PersistentStore, ai: AiService) -> Self {
        let notes: Vec<Note> = store.load(NOTES_KEY);
        let files: Vec<FileItem> = store.load(FILES_KEY);
        info!(
            "Workspace loaded with {} notes and {} files",
            notes.len(),
            files.len()
        );

        Workspace {
            notes,
            files,
            active_note_id: None,
            view: ViewType::default(),
            search_query: String::new(),
            store,
            ai,
            summarizing: HashSet::new(),
            analyzing: HashSet::new(),
        }
    }

    pub fn into_shared(self) -> SharedWorkspace {
        Arc::new(Mutex::new(self))
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn files(&self) -> &[FileItem] {
        &self.files
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn file(&self, id: &str) -> Option<&FileItem> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn active_note_id(&self) -> Option<&str> {
        self.active_note_id.as_deref()
    }

    pub fn view(&self) -> ViewType {
        self.view
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    fn note_mut(&mut self, id: &str) -> Option<&mut Note> {
        self.notes.iter_mut().find(|n| n.id == id)
    }

    fn file_mut(&mut self, id: &str) -> Option<&mut FileItem> {
        self.files.iter_mut().find(|f| f.id == id)
    }

    // Storage failures are logged, never surfaced to the caller
    fn persist_notes(&self) {
        if let Err(e) = self.store.save(NOTES_KEY, &self.notes) {
            error!("Failed to persist notes: {}", e);
        }
    }

    fn persist_files(&self) {
        if let Err(e) = self.store.save(FILES_KEY, &self.files) {
            error!("Failed to persist files: {}", e);
        }
    }

    /// Inserts an empty note at the head and makes it active
    pub fn create_note(&mut self) -> &Note {
        let note = Note::new();
        info!("Created note {}", note.id);
        self.active_note_id = Some(note.id.clone());
        self.notes.insert(0, note);
        self.persist_notes();
        &self.notes[0]
    }

    /// Merges `patch` into the note. Returns `false` when the id is unknown.
    pub fn update_note(&mut self, id: &str, patch: NotePatch) -> bool {
        let Some(note) = self.note_mut(id) else {
            debug!("Ignoring update for unknown note {}", id);
            return false;
        };
        note.apply(patch);
        self.persist_notes();
        true
    }

    /// Removes the note, clearing the selection if it was active
    pub fn delete_note(&mut self, id: &str) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        if self.notes.len() == before {
            debug!("Ignoring delete for unknown note {}", id);
            return false;
        }

        if self.active_note_id.as_deref() == Some(id) {
            self.active_note_id = None;
        }
        info!("Deleted note {}", id);
        self.persist_notes();
        true
    }

    /// Flips the favorite flag; returns the new value
    pub fn toggle_favorite(&mut self, id: &str) -> Option<bool> {
        let note = self.note_mut(id)?;
        let favorite = !note.is_favorite;
        note.apply(NotePatch {
            is_favorite: Some(favorite),
            ..Default::default()
        });
        self.persist_notes();
        Some(favorite)
    }

    /// Makes `id` the active note; unknown ids leave the selection alone
    pub fn open_note(&mut self, id: &str) -> bool {
        if self.note(id).is_none() {
            return false;
        }
        self.active_note_id = Some(id.to_string());
        true
    }

    pub fn close_note(&mut self) {
        self.active_note_id = None;
    }

    pub fn set_view(&mut self, view: ViewType) {
        self.view = view;
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    /// Notes of the current view matching the search query, newest first.
    ///
    /// The matches are collected and sorted up front; the returned view is
    /// materialized, not lazy, and reflects the state at the time of the call.
    pub fn filtered_notes(&self) -> FilteredNotes<'_> {
        let favorites_only = self.view == ViewType::Favorites;
        let needle = if self.view.searches_notes() {
            self.search_query.trim().to_lowercase()
        } else {
            String::new()
        };

        let mut notes: Vec<&Note> = self
            .notes
            .iter()
            .filter(|n| !favorites_only || n.is_favorite)
            .filter(|n| n.matches(&needle))
            .collect();
        // Stable sort keeps collection order between equal timestamps
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        FilteredNotes { notes }
    }

    /// Files whose name matches the query in the files view, all otherwise
    pub fn filtered_files(&self) -> Vec<&FileItem> {
        let needle = if self.view == ViewType::Files {
            self.search_query.trim().to_lowercase()
        } else {
            String::new()
        };
        self.files
            .iter()
            .filter(|f| needle.is_empty() || f.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Encodes `bytes` and inserts the file at the head of the collection.
    ///
    /// The collection is left unchanged when encoding fails.
    pub fn upload_file(&mut self, bytes: &[u8], name: &str, mime_type: &str) -> Result<&FileItem> {
        let file = FileItem::from_bytes(bytes, name, mime_type).map_err(|e| {
            warn!("Rejected upload of {}: {}", name, e);
            e
        })?;
        info!("Uploaded {} ({} bytes) as {}", file.name, file.size, file.id);
        self.files.insert(0, file);
        self.persist_files();
        Ok(&self.files[0])
    }

    /// Reads the payload from `reader` before uploading it
    pub fn upload_reader<R: Read>(
        &mut self,
        mut reader: R,
        name: &str,
        mime_type: &str,
    ) -> Result<&FileItem> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| LuminaError::Encoding {
                message: format!("failed to read {}: {}", name, e),
            })?;
        self.upload_file(&bytes, name, mime_type)
    }

    /// Uploads a file from disk, guessing the MIME type when none is given
    pub fn upload_path(&mut self, path: &Path, mime_type: Option<&str>) -> Result<&FileItem> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_type.unwrap_or_else(|| guess_mime_type(path));
        let file = File::open(path).map_err(|e| LuminaError::Encoding {
            message: format!("failed to open {}: {}", path.display(), e),
        })?;
        self.upload_reader(file, &name, mime_type)
    }

    pub fn delete_file(&mut self, id: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f.id != id);
        if self.files.len() == before {
            debug!("Ignoring delete for unknown file {}", id);
            return false;
        }
        info!("Deleted file {}", id);
        self.persist_files();
        true
    }

    /// Whether an AI request is outstanding for the note or file `id`
    pub fn is_processing(&self, id: &str) -> bool {
        self.summarizing.contains(id) || self.analyzing.contains(id)
    }

    /// Marks the note as being summarized and returns the work to run.
    ///
    /// `None` when the note is unknown, has no content, or already has a
    /// request in flight.
    pub fn begin_note_summary(&mut self, id: &str) -> Option<AiJob> {
        let note = self.note(id)?;
        if note.content.is_empty() {
            debug!("Note {} has no content to summarize", id);
            return None;
        }
        if self.summarizing.contains(id) {
            debug!("Summary already in flight for note {}", id);
            return None;
        }

        let job = AiJob {
            ai: self.ai.clone(),
            input: JobInput::Summary {
                title: note.title.clone(),
                content: note.content.clone(),
            },
        };
        self.summarizing.insert(id.to_string());
        Some(job)
    }

    /// Clears the in-flight mark and stores a successful summary
    pub fn finish_note_summary(
        &mut self,
        id: &str,
        outcome: std::result::Result<String, AiFailure>,
    ) -> std::result::Result<String, AiFailure> {
        self.summarizing.remove(id);
        let summary = outcome?;
        if self.update_note(
            id,
            NotePatch {
                ai_summary: Some(summary.clone()),
                ..Default::default()
            },
        ) {
            info!("Stored AI summary for note {}", id);
        } else {
            debug!("Note {} was deleted before its summary arrived", id);
        }
        Ok(summary)
    }

    /// Marks the file as being analyzed and returns the work to run
    pub fn begin_file_analysis(&mut self, id: &str) -> Option<AiJob> {
        let file = self.file(id)?;
        if self.analyzing.contains(id) {
            debug!("Analysis already in flight for file {}", id);
            return None;
        }

        let job = AiJob {
            ai: self.ai.clone(),
            input: JobInput::Analysis(file.clone()),
        };
        self.analyzing.insert(id.to_string());
        Some(job)
    }

    /// Clears the in-flight mark and overwrites the description on success
    pub fn finish_file_analysis(
        &mut self,
        id: &str,
        outcome: std::result::Result<String, AiFailure>,
    ) -> std::result::Result<String, AiFailure> {
        self.analyzing.remove(id);
        let description = outcome?;
        match self.file_mut(id) {
            Some(file) => {
                file.ai_description = Some(description.clone());
                info!("Stored AI description for file {}", id);
                self.persist_files();
            }
            None => debug!("File {} was deleted before its analysis arrived", id),
        }
        Ok(description)
    }
}

/// Materialized, restartable list of the filtered notes
#[derive(Debug, Clone)]
pub struct FilteredNotes<'a> {
    notes: Vec<&'a Note>,
}

impl<'a> FilteredNotes<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a Note> + '_ {
        self.notes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.iter().map(|n| n.id.as_str()).collect()
    }
}

impl<'a> IntoIterator for FilteredNotes<'a> {
    type Item = &'a Note;
    type IntoIter = std::vec::IntoIter<&'a Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.into_iter()
    }
}

#[derive(Debug, Clone)]
enum JobInput {
    Summary {
        title: String,
        content: String,
    },
    Analysis(FileItem),
}

/// An AI request detached from the workspace
#[derive(Clone)]
pub struct AiJob {
    ai: AiService,
    input: JobInput,
}

impl AiJob {
    pub async fn run(&self) -> std::result::Result<String, AiFailure> {
        match &self.input {
            JobInput::Summary { title, content } => self.ai.summarize(title, content).await,
            JobInput::Analysis(file) => self.ai.analyze(file).await,
        }
    }
}

/// Summarizes note `id` without holding the workspace lock during the call.
///
/// `Ok(None)` when the request was skipped (unknown note, empty content or a
/// request already in flight).
pub async fn summarize_note(workspace: &SharedWorkspace, id: &str) -> Result<Option<String>> {
    let Some(job) = workspace.lock().await.begin_note_summary(id) else {
        return Ok(None);
    };
    let outcome = job.run().await;
    let summary = workspace.lock().await.finish_note_summary(id, outcome)?;
    Ok(Some(summary))
}

/// Analyzes file `id`; same contract as [`summarize_note`]
pub async fn analyze_file(workspace: &SharedWorkspace, id: &str) -> Result<Option<String>> {
    let Some(job) = workspace.lock().await.begin_file_analysis(id) else {
        return Ok(None);
    };
    let outcome = job.run().await;
    let description = workspace.lock().await.finish_file_analysis(id, outcome)?;
    Ok(Some(description))
}
