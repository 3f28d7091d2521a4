use crate::core::model::{Character, Script, ScriptLine};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

const TITLE_MARKER: &str = "TITLE:";
const ROSTER_MARKERS: [&str; 2] = ["CHARACTERS:", "Characters:"];
const ROSTER_END: &str = "---";

lazy_static! {
    // "Character 3: A shepherd", "narrator - tells the story"
    static ref ROSTER_ENTRY: Regex =
        Regex::new(r"(?i)^(Character [0-9]+|Narrator):?\s*(.+)").unwrap();
    // "CHARACTER 1: Hello.", "NARRATOR: Once upon a time."
    static ref DIALOGUE: Regex = Regex::new(r"^([A-Z\s]+[0-9]*):\s*(.+)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    InRoster,
    InBody,
}

#[derive(Debug)]
enum LineShape<'a> {
    Blank,
    Title(&'a str),
    RosterStart,
    RosterEnd,
    RosterEntry { name: String, description: &'a str },
    StageDirection(&'a str),
    Dialogue { label: &'a str, text: &'a str },
    Unrecognized,
}

fn trim_line(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

fn classify(line: &str, state: State) -> LineShape<'_> {
    if let Some(rest) = line.strip_prefix(TITLE_MARKER) {
        return LineShape::Title(trim_line(rest));
    }
    if ROSTER_MARKERS.iter().any(|marker| *marker == line) {
        return LineShape::RosterStart;
    }
    if line == ROSTER_END {
        return LineShape::RosterEnd;
    }
    if line.is_empty() {
        return LineShape::Blank;
    }

    if state == State::InRoster {
        return match ROSTER_ENTRY.captures(line) {
            Some(caps) => LineShape::RosterEntry {
                name: caps[1].to_uppercase(),
                description: caps.get(2).map_or("", |m| m.as_str()),
            },
            None => LineShape::Unrecognized,
        };
    }

    if line.starts_with('[') && line.ends_with(']') {
        return LineShape::StageDirection(line);
    }

    match DIALOGUE.captures(line) {
        Some(caps) => LineShape::Dialogue {
            label: caps.get(1).map_or("", |m| m.as_str().trim()),
            text: caps.get(2).map_or("", |m| m.as_str()),
        },
        None => LineShape::Unrecognized,
    }
}

struct ScriptBuilder {
    title: String,
    characters: Vec<Character>,
    lines: Vec<ScriptLine>,
    next_index: usize,
}

impl ScriptBuilder {
    fn new() -> Self {
        Self {
            title: String::new(),
            characters: Vec::new(),
            lines: Vec::new(),
            next_index: 1,
        }
    }

    fn declare(&mut self, name: String, description: &str) {
        if self.characters.iter().any(|c| c.name == name) {
            debug!("Ignoring repeated roster entry for {}", name);
            return;
        }
        self.push_character(name, description.to_string());
    }

    fn speaker(&mut self, label: &str) -> String {
        if !self.characters.iter().any(|c| c.name == label) {
            self.push_character(label.to_string(), String::new());
        }
        label.to_string()
    }

    fn push_character(&mut self, name: String, description: String) {
        self.characters.push(Character {
            name,
            description,
            index: self.next_index,
        });
        self.next_index += 1;
    }

    fn finish(self) -> Script {
        Script::from_parts(self.title, self.characters, self.lines)
    }
}

/// Turns generated skit text into a [`Script`].
///
/// The text comes from a language model and is not guaranteed to follow the
/// requested layout, so nothing here fails: unrecognized lines are dropped and
/// the result may be partial or empty.
pub fn parse(raw: &str) -> Script {
    let mut state = State::Start;
    let mut builder = ScriptBuilder::new();

    for (number, raw_line) in raw.split('\n').enumerate() {
        let line = trim_line(raw_line);

        match classify(line, state) {
            LineShape::Title(title) => builder.title = title.to_string(),
            LineShape::RosterStart => state = State::InRoster,
            LineShape::RosterEnd => state = State::InBody,
            LineShape::Blank => {}
            LineShape::RosterEntry { name, description } => builder.declare(name, description),
            LineShape::StageDirection(text) => {
                builder.lines.push(ScriptLine::StageDirection {
                    text: text.to_string(),
                });
            }
            LineShape::Dialogue { label, text } => {
                let character = builder.speaker(label);
                builder.lines.push(ScriptLine::Dialogue {
                    character,
                    text: text.to_string(),
                });
            }
            LineShape::Unrecognized => {
                debug!("Dropping line {} ({:?}): {}", number + 1, state, line);
            }
        }
    }

    let script = builder.finish();
    if let Some(warning) = script.warning() {
        warn!("{}", warning);
    }
    script
}
