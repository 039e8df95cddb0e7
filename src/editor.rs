//! Editing session for a single note with deferred saving.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, info};
use tokio::sync::Mutex;

use crate::{
    summarize_note, AutosaveScheduler, Flush, LuminaError, NotePatch, Result, SharedWorkspace,
};

/// Edits not yet written to the workspace
struct Draft {
    workspace: SharedWorkspace,
    note_id: String,
    pending: Mutex<NotePatch>,
}

#[async_trait]
impl Flush for Draft {
    async fn flush(&self) {
        let patch = std::mem::take(&mut *self.pending.lock().await);
        if patch.is_empty() {
            return;
        }
        let mut workspace = self.workspace.lock().await;
        if workspace.update_note(&self.note_id, patch) {
            debug!("Autosaved note {}", self.note_id);
        } else {
            debug!("Dropped draft for deleted note {}", self.note_id);
        }
    }
}

/// An open note. Edits accumulate in a draft that is written after the
/// autosave delay or when the editor closes.
pub struct NoteEditor {
    draft: Arc<Draft>,
    scheduler: AutosaveScheduler,
}

impl NoteEditor {
    /// Activates note `id` and starts its autosave timer
    pub async fn open(workspace: SharedWorkspace, id: &str, delay: Duration) -> Result<Self> {
        if !workspace.lock().await.open_note(id) {
            return Err(LuminaError::NoteNotFound { id: id.to_string() });
        }
        info!("Opened editor for note {}", id);

        let draft = Arc::new(Draft {
            workspace,
            note_id: id.to_string(),
            pending: Mutex::new(NotePatch::default()),
        });
        let scheduler = AutosaveScheduler::spawn(delay, Arc::clone(&draft));

        Ok(NoteEditor { draft, scheduler })
    }

    pub fn note_id(&self) -> &str {
        &self.draft.note_id
    }

    async fn edit(&self, patch: NotePatch) -> Result<()> {
        self.draft.pending.lock().await.merge(patch);
        self.scheduler.touch()
    }

    pub async fn set_title(&self, title: impl Into<String>) -> Result<()> {
        self.edit(NotePatch::title(title)).await
    }

    pub async fn set_content(&self, content: impl Into<String>) -> Result<()> {
        self.edit(NotePatch::content(content)).await
    }

    pub async fn set_tags(&self, tags: Vec<String>) -> Result<()> {
        self.edit(NotePatch {
            tags: Some(tags),
            ..Default::default()
        })
        .await
    }

    /// Writes the draft now, then asks for a summary of the saved note
    pub async fn summarize(&self) -> Result<Option<String>> {
        self.draft.flush().await;
        summarize_note(&self.draft.workspace, &self.draft.note_id).await
    }

    /// Flushes pending edits, stops the timer and clears the active note
    pub async fn close(self) -> Result<()> {
        self.scheduler.shutdown().await?;
        // Flush again in case the scheduler had already fired and a later edit raced it
        self.draft.flush().await;

        let mut workspace = self.draft.workspace.lock().await;
        if workspace.active_note_id() == Some(self.draft.note_id.as_str()) {
            workspace.close_note();
        }
        info!("Closed editor for note {}", self.draft.note_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::time;

    use super::*;
    use crate::ai::testing::{service, ScriptedModel};
    use crate::{MemoryStore, PersistentStore, Workspace};

    fn shared() -> SharedWorkspace {
        let model = Arc::new(ScriptedModel::replying("short summary"));
        Workspace::load(PersistentStore::new(MemoryStore::new()), service(model)).into_shared()
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn edits_are_written_once_after_idle_delay() {
        let ws = shared();
        let id = ws.lock().await.create_note().id.clone();
        let editor = NoteEditor::open(ws.clone(), &id, Duration::from_millis(1000))
            .await
            .unwrap();
        let created = ws.lock().await.note(&id).unwrap().updated_at;

        editor.set_title("Draft").await.unwrap();
        editor.set_content("first line").await.unwrap();
        settle().await;
        time::advance(Duration::from_millis(500)).await;
        settle().await;
        assert!(ws.lock().await.note(&id).unwrap().title.is_empty());

        time::advance(Duration::from_millis(600)).await;
        settle().await;
        {
            let guard = ws.lock().await;
            let note = guard.note(&id).unwrap();
            assert_eq!(note.title, "Draft");
            assert_eq!(note.content, "first line");
            assert!(note.updated_at > created);
        }

        editor.close().await.unwrap();
        assert_eq!(ws.lock().await.active_note_id(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn close_flushes_pending_edits() {
        let ws = shared();
        let id = ws.lock().await.create_note().id.clone();
        let editor = NoteEditor::open(ws.clone(), &id, Duration::from_secs(60))
            .await
            .unwrap();

        editor.set_content("unsaved").await.unwrap();
        editor.set_tags(vec!["work".into(), "work".into()]).await.unwrap();
        editor.close().await.unwrap();

        let guard = ws.lock().await;
        let note = guard.note(&id).unwrap();
        assert_eq!(note.content, "unsaved");
        assert_eq!(note.tags, vec!["work".to_string()]);
    }

    #[tokio::test]
    async fn opening_unknown_note_fails() {
        let ws = shared();
        let result = NoteEditor::open(ws, "missing", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(LuminaError::NoteNotFound { .. })));
    }

    #[tokio::test]
    async fn summarize_uses_the_latest_draft() {
        let ws = shared();
        let id = ws.lock().await.create_note().id.clone();
        let editor = NoteEditor::open(ws.clone(), &id, Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(editor.summarize().await.unwrap(), None);

        editor.set_content("Draft budget numbers").await.unwrap();
        assert_eq!(
            editor.summarize().await.unwrap().as_deref(),
            Some("short summary")
        );
        assert_eq!(
            ws.lock().await.note(&id).unwrap().ai_summary.as_deref(),
            Some("short summary")
        );
        editor.close().await.unwrap();
    }
}
