//! Choosing which catalog programs to install

use std::fmt;

use anyhow::{Result, bail};
use inquire::{InquireError, MultiSelect};

use crate::catalog::Program;

/// Keep only the programs named in `names`, in catalog order.
///
/// Unknown names are an error listing every one of them.
pub fn filter_only(programs: Vec<Program>, names: &[String]) -> Result<Vec<Program>> {
    let unknown: Vec<&str> = names
        .iter()
        .filter(|n| !programs.iter().any(|p| &p.name == *n))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        bail!("unknown programs: {}", unknown.join(", "));
    }
    Ok(programs
        .into_iter()
        .filter(|p| names.contains(&p.name))
        .collect())
}

struct Item(Program);

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0.name, self.0.repo)
    }
}

/// Ask the operator which programs to install.
///
/// Escape or Ctrl-C yields an empty selection.
pub fn prompt_programs(programs: Vec<Program>) -> Result<Vec<Program>> {
    let items: Vec<Item> = programs.into_iter().map(Item).collect();

    println!();
    let selection = match MultiSelect::new("Select programs to install", items)
        .with_page_size(15)
        .with_help_message("  ↑↓ navigate  space select  → all  enter confirm  esc cancel")
        .prompt_skippable()
    {
        Ok(Some(selection)) => selection,
        Ok(None) | Err(InquireError::OperationInterrupted) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(selection.into_iter().map(|item| item.0).collect())
}
