use crate::core::locator::Locator;
use crate::core::model::Script;
use crate::services::projector::{project, RenderModel};
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Input,
    Script,
}

/// Returned by [`Session::begin_generation`] while a request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Busy;

/// Everything a front-end needs to remember between user actions.
#[derive(Debug, Clone, Default)]
pub struct Session {
    script: Option<Script>,
    focus: Option<String>,
    view: View,
    busy: bool,
    locator: Locator,
    /// Focus named by the locator the session started from, applied once a
    /// script is available.
    pending_focus: Option<String>,
}

impl Session {
    pub fn new(locator: Locator) -> Self {
        Self {
            pending_focus: locator.focus(),
            locator,
            ..Default::default()
        }
    }

    pub fn script(&self) -> Option<&Script> {
        self.script.as_ref()
    }

    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn set_script(&mut self, script: Script) {
        info!(
            "Loaded script '{}' with {} characters and {} lines",
            script.title(),
            script.characters().len(),
            script.lines().len()
        );
        self.script = Some(script);
        self.view = View::Script;
        self.set_focus(None);
    }

    /// Focuses `name` if the current script has such a character.
    pub fn select_character(&mut self, name: &str) {
        let known = self
            .script
            .as_ref()
            .is_some_and(|s| s.character(name).is_some());
        if known {
            self.set_focus(Some(name.to_string()));
        } else {
            debug!("Ignoring selection of unknown character {}", name);
        }
    }

    pub fn clear_focus(&mut self) {
        self.set_focus(None);
    }

    pub fn restore_focus_from_locator(&mut self, name: &str) {
        if self.script.is_none() {
            debug!("No script loaded, locator focus {} not restored", name);
            return;
        }
        self.select_character(name);
    }

    /// Applies the focus of the startup locator. Waits for a script, then
    /// applies at most once.
    pub fn restore_from_locator(&mut self) {
        if self.script.is_none() {
            return;
        }
        if let Some(name) = self.pending_focus.take() {
            self.restore_focus_from_locator(&name);
        }
    }

    pub fn back(&mut self) {
        self.view = View::Input;
        self.set_focus(None);
    }

    pub fn begin_generation(&mut self) -> Result<(), Busy> {
        if self.busy {
            return Err(Busy);
        }
        self.busy = true;
        Ok(())
    }

    pub fn finish_generation(&mut self) {
        self.busy = false;
    }

    pub fn projection(&self) -> Option<RenderModel> {
        self.script.as_ref().map(|s| project(s, self.focus()))
    }

    fn set_focus(&mut self, focus: Option<String>) {
        self.locator = self.locator.with_focus(focus.as_deref());
        self.focus = focus;
    }
}
