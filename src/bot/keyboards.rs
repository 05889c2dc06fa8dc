//! Inline keyboard builders and callback-data conventions.
//!
//! Callback data is `prefix:payload`; the update consumer routes on the
//! prefix. Keyboards are plain `Button` lists (one per row), rendered by
//! the messenger client.

use claudegram_core::messenger::Button;

use crate::projects::Project;
use crate::supervisor::SessionSummary;

pub const PROJECT_PREFIX: &str = "project:";
pub const SWITCH_PREFIX: &str = "switch:";
pub const KILL_PREFIX: &str = "kill:";
pub const PAGE_PREFIX: &str = "page:";
pub const UPDATE_PREFIX: &str = "update:";

/// Projects shown per picker page.
pub const PAGE_SIZE: usize = 8;

/// Paged project picker for /new.
pub fn project_picker(projects: &[Project], page: usize) -> Vec<Button> {
    let pages = projects.len().div_ceil(PAGE_SIZE).max(1);
    let page = page.min(pages - 1);
    let start = page * PAGE_SIZE;

    let mut buttons: Vec<Button> = projects
        .iter()
        .skip(start)
        .take(PAGE_SIZE)
        .map(|project| {
            Button::new(
                format!("📁 {}", project.name),
                format!("{PROJECT_PREFIX}{}", project.name),
            )
        })
        .collect();

    if page > 0 {
        buttons.push(Button::new(
            format!("⬅️ Page {}", page),
            format!("{PAGE_PREFIX}{}", page - 1),
        ));
    }
    if page + 1 < pages {
        buttons.push(Button::new(
            format!("➡️ Page {}", page + 2),
            format!("{PAGE_PREFIX}{}", page + 1),
        ));
    }
    buttons
}

/// Switch/kill rows for /sessions.
pub fn session_list(sessions: &[SessionSummary]) -> Vec<Button> {
    let mut buttons = Vec::new();
    for summary in sessions {
        let marker = if summary.active { "▶" } else { "·" };
        buttons.push(Button::new(
            format!("{marker} {}", summary.project),
            format!("{SWITCH_PREFIX}{}", summary.id),
        ));
        buttons.push(Button::new(
            format!("✖ Kill {}", summary.project),
            format!("{KILL_PREFIX}{}", summary.id),
        ));
    }
    buttons
}

/// Confirmation for /update_claude.
pub fn update_confirm() -> Vec<Button> {
    vec![Button::new("Run update", format!("{UPDATE_PREFIX}run"))]
}
