#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use anyhow::{anyhow, bail, Context, Result};
    use clap::{Parser, Subcommand};
    use indicatif::{ProgressBar, ProgressStyle};
    use inquire::{CustomType, Password, Select, Text};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use skitgen::core::config::{Config, DEFAULT_CONFIG_PATH};
    use skitgen::core::io::{CredentialStore, FileCredentialStore};
    use skitgen::core::locator::Locator;
    use skitgen::core::state::Session;
    use skitgen::services::export::to_plain_text;
    use skitgen::services::generator::{
        DirectClient, GenerationClient, ProxyClient, SkitRequest, MAX_PEOPLE, MIN_PEOPLE,
    };
    use skitgen::services::llm::{AnthropicClient, LlmClient};
    use skitgen::services::parser::parse;
    use skitgen::services::server;

    const TONES: [&str; 5] = ["humorous", "dramatic", "inspirational", "reverent", "educational"];
    const AUDIENCES: [&str; 5] = ["all-ages", "kids", "preteens", "teens", "adults"];
    const COMEDY_LEVELS: [&str; 5] = ["normal", "funny", "very-funny", "hilarious", "super-hilarious"];

    #[derive(Parser)]
    #[command(name = "skitgen", version, about = "Generate and read short themed skits")]
    struct Cli {
        /// Configuration file
        #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Run the HTTP proxy that forwards generate requests upstream
        Serve {
            /// Address to listen on (overrides the config file)
            #[arg(long)]
            bind: Option<String>,
            /// Directory with the browser bundle to serve at /
            #[arg(long)]
            static_dir: Option<String>,
        },
        /// Generate a skit; prompts for anything not given
        Generate {
            #[arg(long)]
            topic: Option<String>,
            #[arg(long)]
            tone: Option<String>,
            /// Number of people, 2 to 10
            #[arg(long)]
            people: Option<i64>,
            #[arg(long)]
            audience: Option<String>,
            /// Comedy level, only used with the humorous tone
            #[arg(long)]
            comedy: Option<String>,
            /// Base URL of a running `skitgen serve` instead of calling the LLM directly
            #[arg(long)]
            server: Option<String>,
            /// Character to highlight
            #[arg(long)]
            focus: Option<String>,
            /// Save the raw generated text here
            #[arg(long)]
            output: Option<PathBuf>,
            /// Print the projected view as JSON
            #[arg(long)]
            json: bool,
        },
        /// Parse a saved skit text and print it
        Parse {
            file: PathBuf,
            #[arg(long)]
            focus: Option<String>,
            /// Shared link; its character parameter selects the focus
            #[arg(long)]
            locator: Option<String>,
            #[arg(long)]
            json: bool,
        },
        /// Store or remove the API key used for direct generation
        Key {
            key: Option<String>,
            #[arg(long)]
            clear: bool,
        },
    }

    pub async fn run() -> Result<()> {
        let cli = Cli::parse();
        let mut config = Config::load(&cli.config)?;

        match cli.command {
            Commands::Serve { bind, static_dir } => {
                if let Some(bind) = bind {
                    config.server.bind = bind;
                }
                if static_dir.is_some() {
                    config.server.static_dir = static_dir;
                }
                server::serve(&config).await
            }
            Commands::Generate {
                topic,
                tone,
                people,
                audience,
                comedy,
                server,
                focus,
                output,
                json,
            } => {
                let request = complete_request(SkitRequest {
                    topic: topic.unwrap_or_default(),
                    audience,
                    tone: tone.unwrap_or_default(),
                    comedy_level: comedy,
                    num_people: people,
                })?;

                let client: Box<dyn GenerationClient> = match server {
                    Some(url) => Box::new(ProxyClient::new(&url)),
                    None => Box::new(direct_client(&config).await?),
                };

                let mut session = Session::default();
                session
                    .begin_generation()
                    .map_err(|_| anyhow!("A generation is already running"))?;

                let spinner = ProgressBar::new_spinner();
                spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
                spinner.set_message("Writing your skit...");
                spinner.enable_steady_tick(Duration::from_millis(100));

                let result = client.generate(&request).await;
                spinner.finish_and_clear();
                session.finish_generation();

                let raw = result.map_err(|e| anyhow!("Error generating script: {}", e))?;
                if let Some(path) = output {
                    std::fs::write(&path, &raw)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Raw script saved to {}", path.display());
                }

                session.set_script(parse(&raw));
                apply_focus(&mut session, focus.as_deref());
                print_session(&session, json)
            }
            Commands::Parse {
                file,
                focus,
                locator,
                json,
            } => {
                let raw = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;

                let mut session = match locator {
                    Some(href) => Session::new(Locator::parse(&href)?),
                    None => Session::default(),
                };
                session.set_script(parse(&raw));
                session.restore_from_locator();
                apply_focus(&mut session, focus.as_deref());
                print_session(&session, json)
            }
            Commands::Key { key, clear } => {
                let store = FileCredentialStore::default_location();
                if clear {
                    store.clear().await?;
                    println!("API key removed.");
                    return Ok(());
                }
                let key = match key {
                    Some(k) => k,
                    None => Password::new("API key:").without_confirmation().prompt()?,
                };
                if key.trim().is_empty() {
                    bail!("API key must not be empty");
                }
                store.save(&key).await?;
                println!("API key saved.");
                Ok(())
            }
        }
    }

    /// Script names are upper case, so `--focus eli` selects `ELI`.
    fn apply_focus(session: &mut Session, focus: Option<&str>) {
        if let Some(name) = focus {
            session.select_character(&name.trim().to_uppercase());
        }
    }

    /// Falls back to the stored credential when the config has no key.
    async fn direct_client(config: &Config) -> Result<DirectClient> {
        let client = DirectClient::from_config(&config.llm)?;
        if client.is_configured() || config.llm.provider != "anthropic" {
            return Ok(client);
        }

        let store = FileCredentialStore::default_location();
        match store.load().await? {
            Some(key) => {
                let cfg = config.llm.anthropic.clone().unwrap_or_default();
                let llm: Arc<dyn LlmClient> = Arc::new(AnthropicClient::new(&key, &cfg));
                Ok(DirectClient::new(Some(llm)))
            }
            None => Ok(client),
        }
    }

    fn complete_request(mut request: SkitRequest) -> Result<SkitRequest> {
        if request.topic.trim().is_empty() {
            request.topic = Text::new("Bible verse, book or theme:").prompt()?;
        }
        if request.tone.trim().is_empty() {
            request.tone = Select::new("Tone:", TONES.to_vec()).prompt()?.to_string();
        }
        if request.audience.is_none() {
            request.audience = Some(Select::new("Audience:", AUDIENCES.to_vec()).prompt()?.to_string());
        }
        if request.tone == "humorous" && request.comedy_level.is_none() {
            request.comedy_level =
                Some(Select::new("Comedy level:", COMEDY_LEVELS.to_vec()).prompt()?.to_string());
        }
        if request.num_people.is_none() {
            let people = CustomType::<i64>::new("Number of people:")
                .with_default(4)
                .with_help_message(&format!("{} to {}", MIN_PEOPLE, MAX_PEOPLE))
                .prompt()?;
            request.num_people = Some(people);
        }
        Ok(request)
    }

    fn print_session(session: &Session, json: bool) -> Result<()> {
        let script = session.script().context("No script loaded")?;

        if json {
            let model = session.projection().context("No script loaded")?;
            println!("{}", serde_json::to_string_pretty(&model)?);
        } else {
            println!("{}", to_plain_text(script, session.focus()));
        }

        if let Some(warning) = script.warning() {
            eprintln!("Warning: {}", warning);
        }
        if session.focus().is_some() {
            eprintln!("Share: {}", session.locator().as_str());
        }
        Ok(())
    }

}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    cli::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
