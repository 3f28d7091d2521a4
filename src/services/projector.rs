use crate::core::model::{Script, ScriptLine};
use serde::Serialize;

/// Number of distinct character colors the front-ends define.
pub const PALETTE_SIZE: usize = 10;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CharacterSelector {
    pub name: String,
    pub description: String,
    /// Color slot in `1..=PALETTE_SIZE`, keyed by position in the roster.
    pub slot: usize,
    pub active: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RenderEntry {
    StageDirection {
        text: String,
    },
    Dialogue {
        character: String,
        text: String,
        /// Color slot in `1..=PALETTE_SIZE`, keyed by the character's stored index.
        slot: usize,
        highlighted: bool,
        dimmed: bool,
    },
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RenderModel {
    pub title: String,
    pub focus: Option<String>,
    /// True when the "view all" control should show as selected.
    pub all_active: bool,
    pub selectors: Vec<CharacterSelector>,
    pub entries: Vec<RenderEntry>,
}

pub fn selector_slot(position: usize) -> usize {
    (position % PALETTE_SIZE) + 1
}

pub fn dialogue_slot(index: usize) -> usize {
    (index % PALETTE_SIZE) + 1
}

/// Builds the renderable view of `script` for the given focus.
///
/// Selector buttons and dialogue lines use different slot keys (collection
/// position vs. stored index), so the same character can get neighbouring
/// colors in the two places. Front-ends rely on the existing assignment.
pub fn project(script: &Script, focus: Option<&str>) -> RenderModel {
    let selectors = script
        .characters()
        .iter()
        .enumerate()
        .map(|(position, character)| CharacterSelector {
            name: character.name.clone(),
            description: character.description.clone(),
            slot: selector_slot(position),
            active: focus == Some(character.name.as_str()),
        })
        .collect();

    let entries = script
        .lines()
        .iter()
        .filter_map(|line| match line {
            ScriptLine::StageDirection { text } => {
                focus.is_none().then(|| RenderEntry::StageDirection { text: text.clone() })
            }
            ScriptLine::Dialogue { character, text } => {
                let index = script.character(character).map_or(0, |c| c.index);
                let selected = focus == Some(character.as_str());
                Some(RenderEntry::Dialogue {
                    character: character.clone(),
                    text: text.clone(),
                    slot: dialogue_slot(index),
                    highlighted: selected,
                    dimmed: focus.is_some() && !selected,
                })
            }
        })
        .collect();

    RenderModel {
        title: script.title().to_string(),
        focus: focus.map(str::to_string),
        all_active: focus.is_none(),
        selectors,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::parser::parse;

    fn flags(model: &RenderModel) -> Vec<(String, bool, bool)> {
        model
            .entries
            .iter()
            .filter_map(|e| match e {
                RenderEntry::Dialogue {
                    character,
                    highlighted,
                    dimmed,
                    ..
                } => Some((character.clone(), *highlighted, *dimmed)),
                RenderEntry::StageDirection { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_stage_directions_hidden_when_focused() {
        let script = parse("[Lights up]\nELI: Hi.");

        let all = project(&script, None);
        assert_eq!(all.entries.len(), 2);
        assert!(matches!(all.entries[0], RenderEntry::StageDirection { .. }));
        assert!(all.all_active);

        let focused = project(&script, Some("ELI"));
        assert_eq!(focused.entries.len(), 1);
        assert_eq!(flags(&focused), vec![("ELI".to_string(), true, false)]);
        assert!(!focused.all_active);
    }

    #[test]
    fn test_focus_highlights_and_dims() {
        let script = parse("A: one\nB: two\nA: three\nB: four");

        let focused = project(&script, Some("A"));
        assert_eq!(
            flags(&focused),
            vec![
                ("A".to_string(), true, false),
                ("B".to_string(), false, true),
                ("A".to_string(), true, false),
                ("B".to_string(), false, true),
            ]
        );

        let unfocused = project(&script, None);
        assert!(flags(&unfocused).iter().all(|(_, h, d)| !h && !d));
    }

    #[test]
    fn test_unknown_focus_dims_everything() {
        let script = parse("[Enter]\nA: one");
        let model = project(&script, Some("NOBODY"));

        assert_eq!(model.entries.len(), 1);
        assert_eq!(flags(&model), vec![("A".to_string(), false, true)]);
        assert!(model.selectors.iter().all(|s| !s.active));
    }

    #[test]
    fn test_slot_keys_differ_between_selector_and_dialogue() {
        let script = parse("CHARACTERS:\nCharacter 1: Host\nCharacter 2: Guest\n---\nCHARACTER 1: Hi.");
        let model = project(&script, Some("CHARACTER 1"));

        assert_eq!(model.selectors[0].slot, 1);
        assert_eq!(model.selectors[1].slot, 2);
        assert!(model.selectors[0].active);
        match &model.entries[0] {
            RenderEntry::Dialogue { slot, .. } => assert_eq!(*slot, 2),
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_slots_wrap_around_palette() {
        assert_eq!(selector_slot(0), 1);
        assert_eq!(selector_slot(9), 10);
        assert_eq!(selector_slot(10), 1);
        assert_eq!(dialogue_slot(9), 10);
        assert_eq!(dialogue_slot(10), 1);
        assert_eq!(dialogue_slot(11), 2);
    }

    #[test]
    fn test_projection_keeps_document_order_and_title() {
        let script = parse("TITLE: Order\n[One]\nX: two\n[Three]");
        let model = project(&script, None);

        assert_eq!(model.title, "Order");
        let texts: Vec<_> = model
            .entries
            .iter()
            .map(|e| match e {
                RenderEntry::StageDirection { text } | RenderEntry::Dialogue { text, .. } => {
                    text.as_str()
                }
            })
            .collect();
        assert_eq!(texts, vec!["[One]", "two", "[Three]"]);
    }
}
