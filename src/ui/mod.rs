use leptos::*;
use wasm_bindgen::JsValue;

use crate::core::io::{CredentialStore, LocalCredentialStore};
use crate::core::locator::Locator;
use crate::core::state::{Session, View};
use crate::services::export::to_plain_text;
use crate::services::generator::{BrowserClient, GenerationClient, SkitRequest};
use crate::services::parser::parse;
use crate::services::projector::RenderEntry;

fn initial_locator() -> Locator {
    window()
        .location()
        .href()
        .ok()
        .and_then(|href| Locator::parse(&href).ok())
        .unwrap_or_default()
}

fn sync_address_bar(locator: &Locator) {
    if let Ok(history) = window().history() {
        if let Err(e) = history.replace_state_with_url(&JsValue::NULL, "", Some(locator.as_str())) {
            log::warn!("Failed to update URL: {:?}", e);
        }
    }
}

fn copy_to_clipboard(text: String) {
    spawn_local(async move {
        let promise = window().navigator().clipboard().write_text(&text);
        match wasm_bindgen_futures::JsFuture::from(promise).await {
            Ok(_) => log::info!("Copied {} bytes to clipboard", text.len()),
            Err(e) => log::error!("Clipboard write failed: {:?}", e),
        }
    });
}

fn client_for(credential: &str) -> BrowserClient {
    let origin = window().location().origin().unwrap_or_default();
    BrowserClient::for_credential(credential, &origin)
}

#[component]
pub fn App() -> impl IntoView {
    let session = create_rw_signal(Session::new(initial_locator()));
    let credential = create_rw_signal(String::new());

    create_effect(move |_| {
        spawn_local(async move {
            match LocalCredentialStore::new() {
                Ok(store) => match store.load().await {
                    Ok(Some(key)) => credential.set(key),
                    Ok(None) => log::info!("No API key stored yet"),
                    Err(e) => log::error!("Failed to read API key: {:?}", e),
                },
                Err(e) => log::error!("Credential storage unavailable: {:?}", e),
            }
        });
    });

    view! {
        <div class="app-container">
            <h1>"Skit Generator"</h1>
            {move || match session.with(|s| s.view()) {
                View::Input => view! { <InputPanel session=session credential=credential/> }.into_view(),
                View::Script => view! { <ScriptPanel session=session/> }.into_view(),
            }}
        </div>
    }
}

#[component]
fn InputPanel(session: RwSignal<Session>, credential: RwSignal<String>) -> impl IntoView {
    let topic = create_rw_signal(String::new());
    let audience = create_rw_signal("all-ages".to_string());
    let tone = create_rw_signal("humorous".to_string());
    let comedy = create_rw_signal("funny".to_string());
    let people = create_rw_signal("4".to_string());
    let error = create_rw_signal(None::<String>);
    let busy = create_memo(move |_| session.with(|s| s.is_busy()));

    let save_key = move |ev| {
        let value = event_target_value(&ev);
        credential.set(value.clone());
        spawn_local(async move {
            if let Ok(store) = LocalCredentialStore::new() {
                let result = if value.trim().is_empty() {
                    store.clear().await
                } else {
                    store.save(&value).await
                };
                if let Err(e) = result {
                    log::error!("Failed to store API key: {:?}", e);
                }
            }
        });
    };

    let on_generate = move |_| {
        let request = SkitRequest {
            topic: topic.get_untracked(),
            audience: Some(audience.get_untracked()),
            tone: tone.get_untracked(),
            comedy_level: Some(comedy.get_untracked()),
            num_people: people.get_untracked().trim().parse().ok(),
        };
        if let Err(e) = request.validate() {
            error.set(Some(e.to_string()));
            return;
        }

        let mut started = false;
        session.update(|s| started = s.begin_generation().is_ok());
        if !started {
            return;
        }
        error.set(None);

        let client = client_for(&credential.get_untracked());
        spawn_local(async move {
            let result = client.generate(&request).await;
            session.update(|s| {
                s.finish_generation();
                match result {
                    Ok(raw) => {
                        s.set_script(parse(&raw));
                        s.restore_from_locator();
                    }
                    Err(e) => error.set(Some(format!("Error generating script: {}", e))),
                }
            });
            session.with_untracked(|s| sync_address_bar(s.locator()));
        });
    };

    view! {
        <section id="input-section">
            <label>"API key (leave blank to use the server's key)"
                <input type="password" prop:value=move || credential.get() on:change=save_key/>
            </label>
            <label>"Bible verse, book or theme"
                <input type="text" prop:value=move || topic.get()
                    on:input=move |ev| topic.set(event_target_value(&ev))/>
            </label>
            <label>"Audience"
                <select on:change=move |ev| audience.set(event_target_value(&ev)) prop:value=move || audience.get()>
                    <option value="all-ages">"All ages"</option>
                    <option value="kids">"Kids"</option>
                    <option value="preteens">"Preteens"</option>
                    <option value="teens">"Teens"</option>
                    <option value="adults">"Adults"</option>
                </select>
            </label>
            <label>"Tone"
                <select on:change=move |ev| tone.set(event_target_value(&ev)) prop:value=move || tone.get()>
                    <option value="humorous">"Humorous"</option>
                    <option value="dramatic">"Dramatic"</option>
                    <option value="inspirational">"Inspirational"</option>
                    <option value="reverent">"Reverent"</option>
                    <option value="educational">"Educational"</option>
                </select>
            </label>
            <Show when=move || tone.get() == "humorous">
                <label>"Comedy level"
                    <select on:change=move |ev| comedy.set(event_target_value(&ev)) prop:value=move || comedy.get()>
                        <option value="normal">"Normal"</option>
                        <option value="funny">"Funny"</option>
                        <option value="very-funny">"Very funny"</option>
                        <option value="hilarious">"Hilarious"</option>
                        <option value="super-hilarious">"Super hilarious"</option>
                    </select>
                </label>
            </Show>
            <label>"Number of people"
                <input type="number" min="2" max="10" prop:value=move || people.get()
                    on:input=move |ev| people.set(event_target_value(&ev))/>
            </label>
            <button id="generate-btn" on:click=on_generate prop:disabled=move || busy.get()>
                "Generate skit"
            </button>
            <Show when=move || busy.get()>
                <p class="loading">"Writing your skit..."</p>
            </Show>
            {move || error.get().map(|e| view! { <p class="error">{e}</p> })}
        </section>
    }
}

#[component]
fn ScriptPanel(session: RwSignal<Session>) -> impl IntoView {
    let model = create_memo(move |_| session.with(|s| s.projection()));
    let warning = create_memo(move |_| session.with(|s| s.script().and_then(|sc| sc.warning())));

    let select = move |name: String| {
        session.update(|s| s.select_character(&name));
        session.with_untracked(|s| sync_address_bar(s.locator()));
    };
    let view_all = move |_| {
        session.update(|s| s.clear_focus());
        session.with_untracked(|s| sync_address_bar(s.locator()));
    };
    let back = move |_| {
        session.update(|s| s.back());
        session.with_untracked(|s| sync_address_bar(s.locator()));
    };
    let print = move |_| {
        if let Err(e) = window().print() {
            log::error!("Print failed: {:?}", e);
        }
    };
    let copy_script = move |_| {
        let text = session.with_untracked(|s| {
            s.script().map(|sc| to_plain_text(sc, s.focus())).unwrap_or_default()
        });
        copy_to_clipboard(text);
    };
    let share = move |_| {
        let link = session.with_untracked(|s| s.locator().as_str().to_string());
        copy_to_clipboard(link);
    };

    view! {
        <section id="script-section">
            <div class="toolbar">
                <button id="back-btn" on:click=back>"Back"</button>
                <button on:click=print>"Print"</button>
                <button on:click=copy_script>"Copy"</button>
                <button on:click=share>"Copy link"</button>
            </div>
            {move || warning.get().map(|w| view! { <p class="warning">{w}</p> })}
            {move || model.get().map(|m| {
                let title = m.title;
                let all_active = m.all_active;
                view! {
                    <div id="character-selector">
                        <button id="view-all-btn" class="character-btn" class:active=all_active on:click=view_all>
                            "View all"
                        </button>
                        {m.selectors.into_iter().map(|sel| {
                            let name = sel.name.clone();
                            let class = format!("character-btn character-{}", sel.slot);
                            view! {
                                <button class=class class:active=sel.active title=sel.description.clone()
                                    on:click=move |_| select(name.clone())>
                                    {sel.name.clone()}
                                </button>
                            }
                        }).collect_view()}
                    </div>
                    <div id="script-display">
                        {(!title.is_empty()).then(|| view! { <div class="script-title">{title}</div> })}
                        {m.entries.into_iter().map(|entry| match entry {
                            RenderEntry::StageDirection { text } => view! {
                                <div class="stage-direction">{text}</div>
                            }.into_view(),
                            RenderEntry::Dialogue { character, text, slot, highlighted, dimmed } => {
                                let color = format!("character-{}", slot);
                                view! {
                                    <div class=format!("script-line {}", color)
                                        class:highlight=highlighted class:dimmed=dimmed
                                        style=format!("border-color: var(--{})", color)>
                                        <div class="character-name" style=format!("color: var(--{})", color)>{character}</div>
                                        <div class="dialogue">{text}</div>
                                    </div>
                                }.into_view()
                            }
                        }).collect_view()}
                    </div>
                }
            })}
        </section>
    }
}
