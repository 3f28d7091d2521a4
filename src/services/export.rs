use crate::core::model::Script;
use crate::services::projector::{project, RenderEntry};

/// Plain-text rendition used for the clipboard and for printing from a
/// terminal. Follows the same visibility rules as the on-screen view:
/// a focused export drops stage directions and marks the focused lines.
pub fn to_plain_text(script: &Script, focus: Option<&str>) -> String {
    let model = project(script, focus);
    let mut out = String::new();

    if !model.title.is_empty() {
        out.push_str(&model.title);
        out.push_str("\n\n");
    }

    let declared: Vec<_> = script
        .characters()
        .iter()
        .filter(|c| c.is_declared())
        .collect();
    if !declared.is_empty() {
        out.push_str("CHARACTERS:\n");
        for character in declared {
            out.push_str(&format!("{}: {}\n", character.name, character.description));
        }
        out.push('\n');
    }

    for entry in &model.entries {
        match entry {
            RenderEntry::StageDirection { text } => out.push_str(text),
            RenderEntry::Dialogue {
                character,
                text,
                highlighted,
                ..
            } => {
                let marker = if *highlighted { "> " } else { "" };
                out.push_str(&format!("{}{}: {}", marker, character, text));
            }
        }
        out.push_str("\n\n");
    }

    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out
}
