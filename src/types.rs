//! Shared types for the Lumina workspace.
//!
//! This module contains the result alias, the view selector and the
//! subcommands understood by the terminal front-end.
use std::{fmt, path::PathBuf, str::FromStr};

use clap::Subcommand;
use serde::{Deserialize, Serialize};

use crate::LuminaError;

/// A specialized Result type for Lumina operations.
pub type Result<T> = std::result::Result<T, LuminaError>;

/// Which collection or filter the workspace is currently presenting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    #[default]
    Notes,
    Files,
    Favorites,
    Settings,
}

impl ViewType {
    /// Whether the note search query applies in this view.
    pub fn searches_notes(self) -> bool {
        matches!(self, ViewType::Notes | ViewType::Favorites)
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViewType::Notes => "notes",
            ViewType::Files => "files",
            ViewType::Favorites => "favorites",
            ViewType::Settings => "settings",
        };
        f.write_str(name)
    }
}

impl FromStr for ViewType {
    type Err = LuminaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notes" => Ok(ViewType::Notes),
            "files" => Ok(ViewType::Files),
            "favorites" => Ok(ViewType::Favorites),
            "settings" => Ok(ViewType::Settings),
            other => Err(LuminaError::ApplicationError {
                message: format!("Unknown view: {}", other),
            }),
        }
    }
}

/// Available subcommands for the lumina application
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List notes, newest first
    List {
        /// Only show favorite notes
        #[clap(short, long)]
        favorites: bool,

        /// Case-insensitive filter on title and content
        #[clap(short, long)]
        search: Option<String>,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Create a new note
    Create {
        /// Title of the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// Content of the note
        #[clap(short, long)]
        content: Option<String>,

        /// Tags to associate with the note (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,
    },

    /// Show a single note
    Show {
        /// ID of the note to show
        id: String,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Edit an existing note
    Edit {
        /// ID of the note to edit
        id: String,

        /// New title for the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New content for the note
        #[clap(short, long)]
        content: Option<String>,

        /// Replace the note's tags (comma-separated)
        #[clap(short = 't', long)]
        tags: Option<String>,
    },

    /// Delete a note by ID
    Delete {
        /// ID of the note to delete
        id: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Toggle the favorite flag of a note
    Favorite {
        /// ID of the note
        id: String,
    },

    /// Ask the AI service to summarize a note
    Summarize {
        /// ID of the note
        id: String,
    },

    /// List uploaded files
    Files {
        /// Case-insensitive filter on file names
        #[clap(short, long)]
        search: Option<String>,

        /// Format output as JSON (payloads omitted)
        #[clap(short, long)]
        json: bool,
    },

    /// Upload a file into the workspace
    Upload {
        /// Path of the file to upload
        path: PathBuf,

        /// MIME type, guessed from the extension when omitted
        #[clap(short, long)]
        mime: Option<String>,
    },

    /// Ask the AI service to describe an uploaded file
    Analyze {
        /// ID of the file
        id: String,
    },

    /// Delete an uploaded file by ID
    DeleteFile {
        /// ID of the file to delete
        id: String,
    },

    /// Show the active configuration
    Settings,
}
