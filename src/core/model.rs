use serde::Serialize;

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Character {
    /// Upper-cased canonical name, unique within a script.
    pub name: String,
    /// Empty when the character was only seen in a dialogue label.
    pub description: String,
    /// First-seen order, starting at 1.
    pub index: usize,
}

impl Character {
    pub fn is_declared(&self) -> bool {
        !self.description.is_empty()
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ScriptLine {
    StageDirection { text: String },
    Dialogue { character: String, text: String },
}

impl ScriptLine {
    pub fn speaker(&self) -> Option<&str> {
        match self {
            ScriptLine::Dialogue { character, .. } => Some(character),
            ScriptLine::StageDirection { .. } => None,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ScriptLine::StageDirection { text } | ScriptLine::Dialogue { text, .. } => text,
        }
    }
}

/// A parsed skit. Only the parser builds one, so every dialogue line refers
/// to an entry of `characters`.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Script {
    title: String,
    characters: Vec<Character>,
    lines: Vec<ScriptLine>,
}

impl Script {
    pub(crate) fn from_parts(
        title: String,
        characters: Vec<Character>,
        lines: Vec<ScriptLine>,
    ) -> Self {
        Self {
            title,
            characters,
            lines,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn dialogue_count(&self) -> usize {
        self.lines.iter().filter(|l| l.speaker().is_some()).count()
    }

    /// Soft viability check for generated text that did not follow the
    /// requested layout. Parsing itself never fails.
    pub fn warning(&self) -> Option<String> {
        if self.lines.is_empty() {
            Some("The generated text contained no recognizable script lines.".to_string())
        } else if self.dialogue_count() == 0 {
            Some("The generated text contained stage directions but no dialogue.".to_string())
        } else {
            None
        }
    }
}
