//! CLI module for the lumina application
//!
//! This module turns parsed commands into workspace intents and renders the
//! resulting views to the terminal.
use std::io::{stdin, stdout, Write};

use chrono::{DateTime, Local};
use log::{debug, info};

use crate::{
    analyze_file, content_preview, format_size, parse_tags, summarize_note, AiTask, Commands,
    Config, FileItem, LuminaError, Note, NoteEditor, NotePatch, Result, SharedWorkspace, ViewType,
};

/// CLI Application handler - processes CLI commands against a workspace
pub struct App {
    /// The workspace being presented
    workspace: SharedWorkspace,

    /// Application configuration
    config: Config,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Create a new CLI application over the given workspace and config
    pub fn new(workspace: SharedWorkspace, config: Config, verbose: bool) -> Self {
        Self {
            workspace,
            config,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::List {
                favorites,
                search,
                json,
            } => self.list_notes(favorites, search, json).await?,

            Commands::Create {
                title,
                content,
                tags,
            } => self.create_note(title, content, tags).await?,

            Commands::Show { id, json } => self.show_note(&id, json).await?,

            Commands::Edit {
                id,
                title,
                content,
                tags,
            } => self.edit_note(&id, title, content, tags).await?,

            Commands::Delete { id, force } => self.delete_note(&id, force).await?,

            Commands::Favorite { id } => self.toggle_favorite(&id).await?,

            Commands::Summarize { id } => self.summarize(&id).await?,

            Commands::Files { search, json } => self.list_files(search, json).await?,

            Commands::Upload { path, mime } => {
                let mut workspace = self.workspace.lock().await;
                workspace.set_view(ViewType::Files);
                let file = workspace.upload_path(&path, mime.as_deref())?;
                println!(
                    "Uploaded {} ({}, {}) with ID: {}",
                    file.name,
                    file.mime_type,
                    format_size(file.size),
                    file.id
                );
            }

            Commands::Analyze { id } => self.analyze(&id).await?,

            Commands::DeleteFile { id } => {
                if !self.workspace.lock().await.delete_file(&id) {
                    return Err(LuminaError::FileNotFound { id });
                }
                println!("File {} deleted", id);
            }

            Commands::Settings => self.show_settings().await?,
        }

        Ok(())
    }

    async fn list_notes(&self, favorites: bool, search: Option<String>, json: bool) -> Result<()> {
        let mut workspace = self.workspace.lock().await;
        workspace.set_view(if favorites {
            ViewType::Favorites
        } else {
            ViewType::Notes
        });
        workspace.set_search_query(search.unwrap_or_default());

        let notes: Vec<&Note> = workspace.filtered_notes().into_iter().collect();
        if json {
            println!("{}", serde_json::to_string_pretty(&notes)?);
            return Ok(());
        }

        if notes.is_empty() {
            if favorites && workspace.search_query().is_empty() {
                println!("No favorites yet. Bookmark important notes to see them here.");
            } else {
                println!("No notes found matching your search.");
            }
            return Ok(());
        }

        print!("{}", render_notes(&notes, term_width(), self.verbose));
        println!(
            "\nFound {} note{}",
            notes.len(),
            if notes.len() == 1 { "" } else { "s" }
        );
        Ok(())
    }

    async fn create_note(
        &self,
        title: Option<String>,
        content: Option<String>,
        tags: Option<String>,
    ) -> Result<()> {
        let mut workspace = self.workspace.lock().await;
        let id = workspace.create_note().id.clone();

        let patch = NotePatch {
            title,
            content,
            tags: tags.map(|t| parse_tags(Some(t))),
            ..Default::default()
        };
        if !patch.is_empty() {
            workspace.update_note(&id, patch);
        }

        println!("Note created with ID: {}", id);
        Ok(())
    }

    async fn show_note(&self, id: &str, json: bool) -> Result<()> {
        let workspace = self.workspace.lock().await;
        let note = workspace.note(id).ok_or_else(|| LuminaError::NoteNotFound {
            id: id.to_string(),
        })?;

        if json {
            println!("{}", serde_json::to_string_pretty(note)?);
        } else {
            print!("{}", render_notes(&[note], term_width(), true));
        }
        Ok(())
    }

    /// Applies edits through an editor session so they take the autosave path
    async fn edit_note(
        &self,
        id: &str,
        title: Option<String>,
        content: Option<String>,
        tags: Option<String>,
    ) -> Result<()> {
        if title.is_none() && content.is_none() && tags.is_none() {
            return Err(LuminaError::ApplicationError {
                message: "Nothing to edit: pass --title, --content or --tags".to_string(),
            });
        }

        let editor =
            NoteEditor::open(self.workspace.clone(), id, self.config.autosave_delay()).await?;
        if let Some(title) = title {
            editor.set_title(title).await?;
        }
        if let Some(content) = content {
            editor.set_content(content).await?;
        }
        if let Some(tags) = tags {
            editor.set_tags(parse_tags(Some(tags))).await?;
        }
        editor.close().await?;

        println!("Note {} updated", id);
        Ok(())
    }

    async fn delete_note(&self, id: &str, force: bool) -> Result<()> {
        let note = self
            .workspace
            .lock()
            .await
            .note(id)
            .cloned()
            .ok_or_else(|| LuminaError::NoteNotFound { id: id.to_string() })?;

        if !force {
            println!("You are about to delete the following note:");
            println!("ID:     {}", note.id);
            println!("Title:  {}", display_title(&note));
            print!("Are you sure? [y/N]: ");
            stdout().flush()?;

            let mut answer = String::new();
            stdin().read_line(&mut answer)?;
            if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                println!("Deletion cancelled");
                return Ok(());
            }
        }

        self.workspace.lock().await.delete_note(id);
        println!("Note {} deleted", id);
        Ok(())
    }

    async fn toggle_favorite(&self, id: &str) -> Result<()> {
        let favorite = self
            .workspace
            .lock()
            .await
            .toggle_favorite(id)
            .ok_or_else(|| LuminaError::NoteNotFound { id: id.to_string() })?;

        if favorite {
            println!("Note {} added to favorites", id);
        } else {
            println!("Note {} removed from favorites", id);
        }
        Ok(())
    }

    async fn summarize(&self, id: &str) -> Result<()> {
        {
            let workspace = self.workspace.lock().await;
            let note = workspace.note(id).ok_or_else(|| LuminaError::NoteNotFound {
                id: id.to_string(),
            })?;
            if note.content.is_empty() {
                println!("Note {} has no content to summarize", id);
                return Ok(());
            }
        }

        println!("{}", console::style("AI Thinking...").dim());
        match summarize_note(&self.workspace, id).await {
            Ok(Some(summary)) => {
                println!("{}", console::style("AI Summary").bold().magenta());
                println!("{}", summary);
            }
            Ok(None) => println!("A summary for note {} is already in progress", id),
            Err(LuminaError::Ai(failure)) => {
                println!("{}", console::style(AiTask::Summary.fallback_message()).red());
                info!("Summary for note {} failed: {}", id, failure);
                if self.verbose {
                    println!("Reason: {}", failure);
                }
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn list_files(&self, search: Option<String>, json: bool) -> Result<()> {
        let mut workspace = self.workspace.lock().await;
        workspace.set_view(ViewType::Files);
        workspace.set_search_query(search.unwrap_or_default());

        let files = workspace.filtered_files();
        if json {
            let listed: Vec<serde_json::Value> = files
                .iter()
                .map(|file| {
                    serde_json::json!({
                        "id": file.id,
                        "name": file.name,
                        "mimeType": file.mime_type,
                        "size": file.size,
                        "uploadedAt": file.uploaded_at,
                        "aiDescription": file.ai_description,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listed)?);
            return Ok(());
        }

        if files.is_empty() {
            println!("Your workspace resources appear here.");
            return Ok(());
        }

        print!("{}", render_files(&files, term_width()));
        Ok(())
    }

    async fn analyze(&self, id: &str) -> Result<()> {
        if self.workspace.lock().await.file(id).is_none() {
            return Err(LuminaError::FileNotFound { id: id.to_string() });
        }

        println!("{}", console::style("Analyzing...").dim());
        match analyze_file(&self.workspace, id).await {
            Ok(Some(description)) => {
                println!("{}", console::style("AI Analysis").bold().magenta());
                println!("{}", description);
            }
            Ok(None) => println!("An analysis for file {} is already in progress", id),
            Err(LuminaError::Ai(failure)) => {
                println!("{}", console::style(AiTask::Analysis.fallback_message()).red());
                info!("Analysis for file {} failed: {}", id, failure);
                if self.verbose {
                    println!("Reason: {}", failure);
                }
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn show_settings(&self) -> Result<()> {
        self.workspace.lock().await.set_view(ViewType::Settings);
        debug!("Rendering settings view");

        println!("{}", serde_json::to_string_pretty(&self.config)?);
        let key_state = if self.config.api_key.is_some() {
            console::style("configured").green()
        } else {
            console::style("missing").yellow()
        };
        println!("API key: {}", key_state);
        if let Some(path) = Config::default_path() {
            println!("Config file: {}", path.display());
        }
        Ok(())
    }
}

fn term_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}

fn display_title(note: &Note) -> &str {
    if note.title.trim().is_empty() {
        "Untitled Note"
    } else {
        &note.title
    }
}

fn format_millis(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Note cards as plain text; `detailed` prints the whole body
fn render_notes(notes: &[&Note], width: usize, detailed: bool) -> String {
    let mut out = String::new();
    for (i, note) in notes.iter().enumerate() {
        if i > 0 {
            out.push_str(&"-".repeat(width.min(50)));
            out.push('\n');
        }

        let star = if note.is_favorite { " *" } else { "" };
        out.push_str(&format!(
            "ID: {} | Updated: {}\n",
            note.id,
            format_millis(note.updated_at)
        ));
        out.push_str(&format!(
            "Title: {}{}\n",
            console::style(display_title(note)).bold(),
            star
        ));

        if !note.tags.is_empty() {
            let tags = note
                .tags
                .iter()
                .map(|tag| format!("#{}", tag))
                .collect::<Vec<_>>()
                .join(" ");
            out.push_str(&format!("Tags: {}\n", console::style(tags).cyan()));
        }

        if detailed {
            if !note.content.is_empty() {
                out.push_str(&format!("\n{}\n", note.content));
            }
        } else {
            let preview = content_preview(&note.content, 100);
            if !preview.is_empty() {
                out.push_str(&format!("\n{}\n", preview));
            }
        }

        if let Some(summary) = &note.ai_summary {
            out.push_str(&format!(
                "\n{} {}\n",
                console::style("AI Summary:").magenta(),
                summary
            ));
        }
    }
    out
}

fn render_files(files: &[&FileItem], width: usize) -> String {
    let mut out = String::new();
    for (i, file) in files.iter().enumerate() {
        if i > 0 {
            out.push_str(&"-".repeat(width.min(50)));
            out.push('\n');
        }
        let subtype = file.mime_type.split('/').nth(1).unwrap_or("");
        out.push_str(&format!(
            "ID: {} | Uploaded: {}\n",
            file.id,
            format_millis(file.uploaded_at)
        ));
        out.push_str(&format!("{}\n", console::style(&file.name).bold()));
        out.push_str(&format!(
            "{} - {}\n",
            format_size(file.size),
            subtype.to_uppercase()
        ));
        match &file.ai_description {
            Some(description) => out.push_str(&format!(
                "{} {}\n",
                console::style("AI Analysis:").magenta(),
                description
            )),
            None => out.push_str("Not analyzed yet\n"),
        }
    }
    out
}
