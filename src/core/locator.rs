use anyhow::{Context, Result};
use url::Url;

/// Query parameter that carries the focused character name.
pub const FOCUS_PARAM: &str = "character";

/// A shareable address encoding the current focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    url: Url,
}

impl Locator {
    pub fn parse(href: &str) -> Result<Self> {
        let url = Url::parse(href).with_context(|| format!("Invalid locator: {}", href))?;
        Ok(Self { url })
    }

    pub fn focus(&self) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == FOCUS_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }

    /// Returns a copy pointing at `focus`, keeping every other query pair.
    pub fn with_focus(&self, focus: Option<&str>) -> Self {
        let others: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| key != FOCUS_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let mut url = self.url.clone();
        url.set_query(None);
        if !others.is_empty() || focus.is_some() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &others {
                pairs.append_pair(key, value);
            }
            if let Some(name) = focus {
                pairs.append_pair(FOCUS_PARAM, name);
            }
        }
        Self { url }
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost/").expect("static url"),
        }
    }
}
