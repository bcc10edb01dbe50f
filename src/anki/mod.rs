// AnkiConnect client and note construction
//
// This module talks to a locally running Anki instance through the
// AnkiConnect add-on (version 6 protocol):
// - client calls: deck/model management, note queries and updates, media upload
// - cards: HTML field building for the note model

pub mod cards;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

pub use cards::*;

use crate::config::AnkiConfig;
use crate::error::{LexiclipError, Result};

#[derive(Debug, Serialize)]
struct AnkiRequest<'a, P: Serialize> {
    action: &'a str,
    version: u8,
    params: P,
}

#[derive(Debug, Deserialize)]
struct AnkiResponse<T> {
    result: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteInfo {
    #[serde(rename = "noteId")]
    pub note_id: u64,
    #[serde(default)]
    pub fields: HashMap<String, NoteFieldValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoteFieldValue {
    #[serde(default)]
    pub value: String,
}

/// Client for the AnkiConnect HTTP API.
pub struct AnkiClient {
    client: Client,
    config: AnkiConfig,
}

impl AnkiClient {
    pub fn new(config: AnkiConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    async fn invoke<P: Serialize, T: DeserializeOwned>(
        &self,
        action: &str,
        params: P,
    ) -> Result<T> {
        debug!("AnkiConnect action: {}", action);

        let request = AnkiRequest {
            action,
            version: 6,
            params,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                LexiclipError::Anki(format!(
                    "Cannot reach AnkiConnect at {}: {}",
                    self.config.endpoint, e
                ))
            })?;

        if !response.status().is_success() {
            return Err(LexiclipError::Anki(format!(
                "AnkiConnect returned HTTP {}",
                response.status()
            )));
        }

        let body: AnkiResponse<T> = response
            .json()
            .await
            .map_err(|e| LexiclipError::Anki(format!("Malformed AnkiConnect response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(LexiclipError::Anki(format!("{}: {}", action, error)));
        }

        body.result
            .ok_or_else(|| LexiclipError::Anki(format!("{}: empty result", action)))
    }

    // Actions whose result is null on success.
    async fn invoke_unit<P: Serialize>(&self, action: &str, params: P) -> Result<()> {
        let _: serde_json::Value = match self.invoke(action, params).await {
            Ok(value) => value,
            Err(LexiclipError::Anki(message)) if message.ends_with("empty result") => {
                serde_json::Value::Null
            }
            Err(e) => return Err(e),
        };
        Ok(())
    }

    /// Check that the add-on answers and speaks a compatible protocol version.
    pub async fn check_availability(&self) -> Result<()> {
        let version: u64 = self.invoke("version", json!({})).await?;
        if version < 6 {
            return Err(LexiclipError::Anki(format!(
                "AnkiConnect version {} is too old, need 6",
                version
            )));
        }
        info!("AnkiConnect is available (version {})", version);
        Ok(())
    }

    /// Create the deck and the note model if either is missing.
    pub async fn ensure_model_and_deck(&self, deck_name: &str) -> Result<()> {
        self.invoke_unit("createDeck", json!({ "deck": deck_name }))
            .await?;

        let model_names: Vec<String> = self.invoke("modelNames", json!({})).await?;
        if !model_names.contains(&self.config.model_name) {
            info!("Creating note model '{}'", self.config.model_name);
            self.create_model().await?;
        } else {
            debug!("Note model '{}' already exists", self.config.model_name);
        }

        Ok(())
    }

    async fn create_model(&self) -> Result<()> {
        self.invoke_unit(
            "createModel",
            json!({
                "modelName": self.config.model_name,
                "inOrderFields": cards::FIELD_NAMES,
                "css": cards::MODEL_CSS,
                "cardTemplates": cards::card_templates(),
            }),
        )
        .await
    }

    /// Note ids matching an Anki search query.
    pub async fn find_notes(&self, query: &str) -> Result<Vec<u64>> {
        self.invoke("findNotes", json!({ "query": query })).await
    }

    /// Note ids whose Word field equals the given word in the given deck.
    pub async fn find_word_notes(&self, deck_name: &str, word: &str) -> Result<Vec<u64>> {
        let query = format!("deck:\"{}\" \"Word:{}\"", deck_name, word);
        self.find_notes(&query).await
    }

    pub async fn notes_info(&self, note_ids: &[u64]) -> Result<Vec<NoteInfo>> {
        self.invoke("notesInfo", json!({ "notes": note_ids })).await
    }

    /// Add a note; returns the new note id.
    pub async fn add_note(
        &self,
        deck_name: &str,
        fields: &HashMap<String, String>,
        tags: &[String],
        allow_duplicate: bool,
    ) -> Result<u64> {
        self.invoke(
            "addNote",
            json!({
                "note": {
                    "deckName": deck_name,
                    "modelName": self.config.model_name,
                    "fields": fields,
                    "options": { "allowDuplicate": allow_duplicate },
                    "tags": tags,
                }
            }),
        )
        .await
    }

    pub async fn update_note_fields(
        &self,
        note_id: u64,
        fields: &HashMap<String, String>,
    ) -> Result<()> {
        self.invoke_unit(
            "updateNoteFields",
            json!({
                "note": { "id": note_id, "fields": fields }
            }),
        )
        .await
    }

    /// Upload a file into Anki's media collection under the given name.
    pub async fn store_media_file(&self, path: &Path, filename: &str) -> Result<()> {
        let bytes = std::fs::read(path)
            .map_err(|e| LexiclipError::Anki(format!("Cannot read {}: {}", path.display(), e)))?;
        let encoded = general_purpose::STANDARD.encode(&bytes);

        let stored: serde_json::Value = self
            .invoke(
                "storeMediaFile",
                json!({ "filename": filename, "data": encoded }),
            )
            .await?;
        debug!("Stored media file {} -> {}", filename, stored);
        Ok(())
    }

    /// Add a note for the word, or append the example to the existing note's
    /// Examples/Blanked_Examples fields when the word is already in the deck.
    pub async fn upsert_word_note(
        &self,
        deck_name: &str,
        word: &str,
        fields: HashMap<String, String>,
        tags: &[String],
    ) -> Result<u64> {
        let existing = self.find_word_notes(deck_name, word).await?;

        let Some(&note_id) = existing.first() else {
            let note_id = self.add_note(deck_name, &fields, tags, false).await?;
            info!("Added note '{}' ({})", word, note_id);
            return Ok(note_id);
        };

        info!("Note '{}' exists ({}), appending example", word, note_id);
        let current = self
            .notes_info(&[note_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LexiclipError::Anki(format!("Note {} vanished", note_id)))?;

        let mut updates = HashMap::new();
        for field in [cards::FIELD_EXAMPLES, cards::FIELD_BLANKED_EXAMPLES] {
            let Some(appended) = fields.get(field) else {
                continue;
            };
            let existing_value = current
                .fields
                .get(field)
                .map(|f| f.value.clone())
                .unwrap_or_default();
            if !appended.is_empty() && !existing_value.contains(appended.as_str()) {
                updates.insert(field.to_string(), format!("{}{}", existing_value, appended));
            }
        }

        // Fill fields an earlier import left blank.
        for field in [
            cards::FIELD_PRONUNCIATION,
            cards::FIELD_DEFINITION,
            cards::FIELD_POS_DEFINITIONS,
        ] {
            let blank = current
                .fields
                .get(field)
                .map(|f| f.value.trim().is_empty())
                .unwrap_or(true);
            if blank {
                if let Some(value) = fields.get(field) {
                    if !value.is_empty() {
                        updates.insert(field.to_string(), value.clone());
                    }
                }
            }
        }

        if updates.is_empty() {
            debug!("Note '{}' needs no update", word);
        } else {
            self.update_note_fields(note_id, &updates).await?;
        }
        Ok(note_id)
    }
}
