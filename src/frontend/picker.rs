//! Interactive executable picker for programs without declared binaries
//!
//! The operator browses the extracted archive, picks files and names the
//! link for each one. Finishing without picking anything is a valid answer
//! and means "install without linking".

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use inquire::{InquireError, Select, Text};

use crate::catalog::BinLink;
use crate::install::is_plain_name;

/// One row of the browse list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Parent,
    Dir(String),
    File(String),
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Parent => f.write_str("../"),
            Entry::Dir(name) => write!(f, "{name}/"),
            Entry::File(name) => f.write_str(name),
        }
    }
}

/// Browse position and links collected so far
#[derive(Debug)]
pub struct BinPicker {
    root: PathBuf,
    current: PathBuf,
    added: Vec<BinLink>,
}

impl BinPicker {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            current: root.to_path_buf(),
            added: Vec::new(),
        }
    }

    pub fn current_dir(&self) -> &Path {
        &self.current
    }

    /// Current directory relative to the root, displayed as `/sub/dir`
    pub fn location(&self) -> String {
        match self.current.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => "/".to_string(),
            Ok(rel) => format!("/{}", rel.display()),
            Err(_) => self.current.display().to_string(),
        }
    }

    /// Directories then files, each sorted by name; hidden entries skipped
    pub fn entries(&self) -> io::Result<Vec<Entry>> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.current)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            // Follows symlinks so a linked directory can be browsed
            if fs::metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false) {
                dirs.push(name);
            } else {
                files.push(name);
            }
        }
        dirs.sort();
        files.sort();

        let mut entries = Vec::with_capacity(dirs.len() + files.len() + 1);
        if self.current != self.root {
            entries.push(Entry::Parent);
        }
        entries.extend(dirs.into_iter().map(Entry::Dir));
        entries.extend(files.into_iter().map(Entry::File));
        Ok(entries)
    }

    pub fn enter(&mut self, dir: &str) {
        self.current = self.current.join(dir);
    }

    /// Move to the parent directory; never above the root
    pub fn up(&mut self) {
        if self.current != self.root {
            if let Some(parent) = self.current.parent() {
                self.current = parent.to_path_buf();
            }
        }
    }

    /// Record a link for `file` in the current directory.
    ///
    /// A blank `name` falls back to the file name. Returns `None`, recording
    /// nothing, when the name would leave the link directory.
    pub fn add(&mut self, file: &str, name: &str) -> Option<&BinLink> {
        let dst = link_name(file, name)?;
        let src = self.current.join(file);
        self.added.push(BinLink::new(src.to_string_lossy(), dst));
        self.added.last()
    }

    pub fn added(&self) -> &[BinLink] {
        &self.added
    }

    pub fn into_links(self) -> Vec<BinLink> {
        self.added
    }
}

/// Link name typed for `file`: trimmed, blank meaning the file name
fn link_name(file: &str, answer: &str) -> Option<String> {
    let answer = answer.trim();
    let name = if answer.is_empty() { file } else { answer };
    is_plain_name(name).then(|| name.to_string())
}

/// Result of one picker session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    /// Possibly empty list of links to create
    Links(Vec<BinLink>),
    /// Operator interrupted the session; the whole run should stop
    Aborted,
}

#[derive(Debug, Clone)]
enum Choice {
    Entry(Entry),
    Finish { added: usize },
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::Entry(entry) => entry.fmt(f),
            Choice::Finish { added: 0 } => f.write_str("[skip linking]"),
            Choice::Finish { added } => write!(f, "[done: link {added}]"),
        }
    }
}

/// Run the blocking browse/name loop for `program` rooted at `root`
pub fn pick_bins(program: &str, root: &Path) -> Result<PickerOutcome> {
    let mut picker = BinPicker::new(root);

    loop {
        let entries = picker
            .entries()
            .with_context(|| format!("Failed to list {}", picker.current_dir().display()))?;

        let mut choices: Vec<Choice> = entries.into_iter().map(Choice::Entry).collect();
        choices.push(Choice::Finish {
            added: picker.added().len(),
        });

        let prompt = format!("Select binary for {program:?}  {}", picker.location());
        let help = if picker.added().is_empty() {
            "enter: open/select   esc: cancel install".to_string()
        } else {
            let added: Vec<_> = picker.added().iter().map(|b| b.dst.as_str()).collect();
            format!("added: {}   esc: cancel install", added.join(", "))
        };

        let choice = match Select::new(&prompt, choices)
            .with_help_message(&help)
            .with_page_size(15)
            .prompt()
        {
            Ok(choice) => choice,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                return Ok(PickerOutcome::Aborted);
            }
            Err(e) => return Err(e).context("Bin picker failed"),
        };

        match choice {
            Choice::Finish { .. } => return Ok(PickerOutcome::Links(picker.into_links())),
            Choice::Entry(Entry::Parent) => picker.up(),
            Choice::Entry(Entry::Dir(name)) => picker.enter(&name),
            Choice::Entry(Entry::File(name)) => loop {
                let answer = Text::new("Name the symlink:")
                    .with_default(&name)
                    .with_help_message("esc: back to browsing")
                    .prompt();
                match answer {
                    Ok(typed) => {
                        if picker.add(&name, &typed).is_some() {
                            break;
                        }
                        eprintln!("{:?} is not a valid link name; use a plain file name", typed.trim());
                    }
                    // Esc returns to browsing
                    Err(InquireError::OperationCanceled) => break,
                    Err(InquireError::OperationInterrupted) => return Ok(PickerOutcome::Aborted),
                    Err(e) => return Err(e).context("Link name prompt failed"),
                }
            },
        }
    }
}
