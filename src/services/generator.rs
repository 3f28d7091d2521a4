use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::services::llm::{
    create_llm, AnthropicClient, AnthropicConfig, LlmBounds, LlmClient, LlmConfig, FALLBACK_ERROR,
};

pub const MIN_PEOPLE: i64 = 2;
pub const MAX_PEOPLE: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Number of people must be between {} and {}", MIN_PEOPLE, MAX_PEOPLE)]
    PeopleOutOfRange(i64),
}

impl ValidationError {
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            ValidationError::MissingFields(fields) => fields.clone(),
            ValidationError::PeopleOutOfRange(_) => vec!["numPeople"],
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("API key not set")]
    MissingCredential,
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Upstream(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkitRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default)]
    pub tone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comedy_level: Option<String>,
    pub num_people: Option<i64>,
}

impl SkitRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut missing = Vec::new();
        if self.topic.trim().is_empty() {
            missing.push("topic");
        }
        if self.tone.trim().is_empty() {
            missing.push("tone");
        }
        if self.num_people.is_none() {
            missing.push("numPeople");
        }
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        match self.num_people {
            Some(n) if !(MIN_PEOPLE..=MAX_PEOPLE).contains(&n) => {
                Err(ValidationError::PeopleOutOfRange(n))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub script: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

const AUDIENCE_GUIDANCE: [(&str, &str); 5] = [
    ("kids", "young children (5-10 years old): simple vocabulary, short sentences, playful language and concepts they can easily follow"),
    ("preteens", "preteens (11-13 years old): age-appropriate vocabulary, relatable situations and themes from middle school life"),
    ("teens", "teenagers (14-18 years old): contemporary language, real-world challenges and deeper themes from high school life"),
    ("adults", "adults: sophisticated vocabulary, mature themes and deeper theological concepts"),
    ("all-ages", "a mixed audience of all ages: clear language children understand that adults still enjoy, with universal themes"),
];

const COMEDY_GUIDANCE: [(&str, &str); 5] = [
    ("normal", ""),
    ("funny", "Include clever wordplay, light humor and a few good jokes."),
    ("very-funny", "Pack it with jokes, puns, funny observations and comedic misunderstandings. The audience should laugh often."),
    ("hilarious", "Go all out: rapid-fire jokes, slapstick, exaggerated reactions, running gags, unexpected punchlines and physical comedy."),
    ("super-hilarious", "Maximum comedy: outrageous puns, absurd situations, breaking the fourth wall, meta jokes, silly sound effects in the stage directions, over-the-top reactions, callbacks, mistimed entrances, props used wrong and deadpan pauses. Every line should aim for a laugh."),
];

const DEFAULT_AUDIENCE: &str = "all-ages";

fn audience_guidance(audience: &str) -> &str {
    AUDIENCE_GUIDANCE
        .iter()
        .find(|(key, _)| *key == audience)
        .map_or(audience, |(_, text)| *text)
}

fn comedy_guidance(request: &SkitRequest) -> Option<&'static str> {
    if request.tone != "humorous" {
        return None;
    }
    let level = request.comedy_level.as_deref()?;
    COMEDY_GUIDANCE
        .iter()
        .find(|(key, _)| *key == level)
        .map(|(_, text)| *text)
        .filter(|text| !text.is_empty())
}

/// Builds the user prompt. The format section mirrors what the parser reads.
pub fn build_prompt(request: &SkitRequest) -> String {
    let audience = request
        .audience
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .unwrap_or(DEFAULT_AUDIENCE);
    let people = request.num_people.unwrap_or(MIN_PEOPLE);
    let tone = request.tone.trim();

    let mut prompt = format!(
        "Create a {} skit or short play based on the Bible topic: \"{}\".\n\n",
        tone,
        request.topic.trim()
    );
    if let Some(comedy) = comedy_guidance(request) {
        prompt.push_str(&format!("COMEDY INSTRUCTIONS: {}\n\n", comedy));
    }
    prompt.push_str(&format!(
        "The skit should:\n\
        - Be designed for {}\n\
        - Be for {} people (create {} distinct characters)\n\
        - Have a {} tone throughout\n\
        - Be approximately 2-3 minutes when performed\n\
        - Be appropriate for church or educational settings\n\
        - Include stage directions in [brackets]\n\
        - Be engaging and memorable\n\
        - Match the vocabulary, humor and complexity to the {} audience level\n\n",
        audience_guidance(audience),
        people,
        people,
        tone,
        audience
    ));
    prompt.push_str(
        "Format the script as follows:\n\
        - Start with a title\n\
        - List each character (e.g., \"Character 1: [role description]\")\n\
        - Write the script with character names in CAPS followed by their lines\n\
        - Include stage directions in [brackets]\n\
        - You may include a NARRATOR if needed\n\n\
        Example format:\n\
        TITLE: [Your Title Here]\n\n\
        CHARACTERS:\n\
        Character 1: [Role]\n\
        Character 2: [Role]\n\n\
        ---\n\n\
        [Stage direction]\n\n\
        CHARACTER 1: Dialogue here.\n\n\
        CHARACTER 2: Response here.\n\n\
        [Stage direction]\n\n\
        Please write the complete skit now.",
    );
    prompt
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait GenerationClient: LlmBounds {
    /// Returns the raw skit text. Invalid requests fail before any network call.
    async fn generate(&self, request: &SkitRequest) -> Result<String, GenerateError>;
}

/// Talks to the language model directly with a locally held credential.
#[derive(Debug, Clone)]
pub struct DirectClient {
    llm: Option<Arc<dyn LlmClient>>,
}

impl DirectClient {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    /// A missing credential is not an error until a generation is attempted.
    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerateError> {
        match create_llm(config) {
            Ok(llm) => Ok(Self::new(Some(Arc::from(llm)))),
            Err(GenerateError::MissingCredential) => {
                log::warn!("No API key configured for provider {}", config.provider);
                Ok(Self::new(None))
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl GenerationClient for DirectClient {
    async fn generate(&self, request: &SkitRequest) -> Result<String, GenerateError> {
        request.validate()?;
        let llm = self.llm.as_ref().ok_or(GenerateError::MissingCredential)?;

        log::info!(
            "Generating {} skit about \"{}\" for {} people",
            request.tone,
            request.topic,
            request.num_people.unwrap_or_default()
        );
        llm.chat("", &build_prompt(request)).await.map_err(|e| {
            log::error!("Error generating script: {:#}", e);
            GenerateError::Upstream(e.to_string())
        })
    }
}

/// Sends requests to a `skitgen serve` instance.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ProxyBody {
    script: Option<String>,
    error: Option<String>,
}

impl ProxyClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl GenerationClient for ProxyClient {
    async fn generate(&self, request: &SkitRequest) -> Result<String, GenerateError> {
        request.validate()?;

        let resp = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| GenerateError::Upstream(e.to_string()))?;
        let status = resp.status();
        let body: Option<ProxyBody> = resp.json().await.ok();

        if !status.is_success() {
            let message = body
                .and_then(|b| b.error)
                .unwrap_or_else(|| FALLBACK_ERROR.to_string());
            log::warn!("Proxy returned {}: {}", status, message);
            return Err(GenerateError::Upstream(message));
        }

        body.and_then(|b| b.script)
            .ok_or_else(|| GenerateError::Upstream(FALLBACK_ERROR.to_string()))
    }
}

/// Client used by the browser front-end: a saved key talks to the model
/// directly, otherwise requests go through the proxy at `origin`.
#[derive(Debug, Clone)]
pub enum BrowserClient {
    Direct(DirectClient),
    Proxy(ProxyClient),
}

impl BrowserClient {
    pub fn for_credential(credential: &str, origin: &str) -> Self {
        let key = credential.trim();
        if key.is_empty() {
            log::debug!("No local API key, using proxy at {}", origin);
            return BrowserClient::Proxy(ProxyClient::new(origin));
        }
        let llm: Arc<dyn LlmClient> = Arc::new(AnthropicClient::new(key, &AnthropicConfig::default()));
        BrowserClient::Direct(DirectClient::new(Some(llm)))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl GenerationClient for BrowserClient {
    async fn generate(&self, request: &SkitRequest) -> Result<String, GenerateError> {
        match self {
            BrowserClient::Direct(client) => client.generate(request).await,
            BrowserClient::Proxy(client) => client.generate(request).await,
        }
    }
}
