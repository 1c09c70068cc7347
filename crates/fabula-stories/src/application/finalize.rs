//! The finalization workflow.
//!
//! Finalizing a story validates the request, renders the chosen text to
//! audio, then applies every database change in one transaction:
//!
//! 1. edit the supplied text generations in place,
//! 2. promote the final text (copying its duration onto the story),
//! 3. insert the audio generation,
//! 4. promote the final audio.
//!
//! The audio provider is called before the transaction opens, with the text
//! as it will read after the edits. A provider failure therefore leaves the
//! store untouched, and the transaction is never held open across the
//! network call. If the transaction fails after a successful render, the
//! rendered file is reported as orphaned in the logs.

use fabula_core::command::Command;
use fabula_core::error::DomainError;
use fabula_core::generation::{AudioGenerationRequest, AudioGenerator, GeneratedAudio};
use fabula_core::model::{NewAudioGeneration, StoryDetails, TextGeneration};
use fabula_core::repository::{StoryStore, StoryTransaction};
use tracing::{error, info, instrument, warn};

use crate::application::StoryRepositories;
use crate::application::query_handlers::{get_story, require_story};
use crate::domain::commands::FinalizeStory;
use crate::domain::validation::{max_length, widths};

/// Collaborators the workflow needs besides the repositories.
#[derive(Clone, Copy)]
pub struct FinalizeServices<'a> {
    /// Opens the transaction for the persistence steps.
    pub store: &'a dyn StoryStore,
    /// Renders the final text.
    pub audio_generator: &'a dyn AudioGenerator,
}

/// Handles the `FinalizeStory` command and returns the hydrated story.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story or the final text generation
/// does not exist.
/// Returns `DomainError::Validation` if a referenced text generation belongs
/// to another story or an edit has no text.
/// Returns `DomainError::Upstream` if the audio provider fails; nothing is
/// changed in that case.
/// Returns `DomainError::Storage` if the transaction fails; it is rolled back.
#[instrument(
    skip(command, repos, services),
    fields(
        correlation_id = %command.correlation_id(),
        story_id = command.story_id,
        final_text_generation_id = command.final_text_generation_id
    )
)]
pub async fn handle_finalize_story(
    command: &FinalizeStory,
    repos: StoryRepositories<'_>,
    services: FinalizeServices<'_>,
) -> Result<StoryDetails, DomainError> {
    let story = require_story(command.story_id, repos).await?;
    let final_text = validate(command, repos).await?;

    let request = AudioGenerationRequest::for_final_text(&story, &final_text)
        .with_overrides(command.voice_name.clone(), command.provider.clone());
    let audio = services.audio_generator.generate_audio(&request).await?;
    info!(audio_file_id = %audio.audio_file_id, "final text rendered");

    let new_audio = NewAudioGeneration {
        story_id: story.id,
        text_generation_id: final_text.id,
        audio_file_id: audio.audio_file_id.clone(),
        duration_seconds: audio.duration_seconds,
        voice_name: command.voice_name.clone(),
        provider: command
            .provider
            .clone()
            .or_else(|| services.audio_generator.provider_name().map(str::to_owned)),
    };

    persist(command, &final_text, &new_audio, &audio, services.store).await?;
    info!("story finalized");

    get_story(story.id, repos).await
}

/// Checks ownership of every referenced text generation and returns the
/// final one as it will read after the edits.
async fn validate(
    command: &FinalizeStory,
    repos: StoryRepositories<'_>,
) -> Result<TextGeneration, DomainError> {
    let story_id = command.story_id;

    max_length("voice_name", command.voice_name.as_deref(), widths::VOICE_NAME)?;
    max_length("provider", command.provider.as_deref(), widths::PROVIDER)?;

    let mut final_text = repos
        .text_generations
        .find(command.final_text_generation_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("Final text generation not found".to_owned()))?;
    if final_text.story_id != story_id {
        return Err(DomainError::Validation(
            "Final text generation does not belong to this story".to_owned(),
        ));
    }

    for edit in &command.text_generations {
        if edit.full_text.is_empty() {
            return Err(DomainError::Validation(format!(
                "Text generation {} has no full_text",
                edit.id
            )));
        }
        if !repos
            .text_generations
            .belongs_to_story(edit.id, story_id)
            .await?
        {
            return Err(DomainError::Validation(format!(
                "Text generation {} does not belong to this story",
                edit.id
            )));
        }
    }

    let final_id = final_text.id;
    for edit in command
        .text_generations
        .iter()
        .filter(|edit| edit.id == final_id)
    {
        edit.apply_to(&mut final_text);
    }

    Ok(final_text)
}

/// Runs the persistence steps in one transaction, rolling back on failure.
async fn persist(
    command: &FinalizeStory,
    final_text: &TextGeneration,
    new_audio: &NewAudioGeneration,
    audio: &GeneratedAudio,
    store: &dyn StoryStore,
) -> Result<(), DomainError> {
    let mut tx = store.begin().await.inspect_err(|e| {
        error!(audio_file_id = %audio.audio_file_id, error = %e, "could not open transaction, rendered audio is orphaned");
    })?;

    match apply(tx.as_mut(), command, final_text, new_audio).await {
        Ok(()) => tx.commit().await.inspect_err(|e| {
            error!(audio_file_id = %audio.audio_file_id, error = %e, "commit failed, rendered audio is orphaned");
        }),
        Err(e) => {
            warn!(error = %e, "finalization failed, rolling back");
            if let Err(rollback_error) = tx.rollback().await {
                error!(error = %rollback_error, "rollback failed");
            }
            error!(audio_file_id = %audio.audio_file_id, "rendered audio is orphaned");
            Err(e)
        }
    }
}

async fn apply(
    tx: &mut dyn StoryTransaction,
    command: &FinalizeStory,
    final_text: &TextGeneration,
    new_audio: &NewAudioGeneration,
) -> Result<(), DomainError> {
    for edit in &command.text_generations {
        tx.update_text_generation(edit).await?;
    }
    tx.promote_final_text(command.story_id, final_text.id, final_text.duration_minutes)
        .await?;
    let audio = tx.insert_audio_generation(new_audio).await?;
    tx.promote_final_audio(command.story_id, audio.id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use fabula_core::error::DomainError;
    use fabula_core::model::{NewStory, NewTextGeneration, Story, TextGenerationEdit};
    use fabula_core::repository::{StoryRepository, TextGenerationRepository};
    use fabula_test_support::{FailingAudioGenerator, InMemoryStore, StubAudioGenerator};
    use uuid::Uuid;

    use super::*;

    struct Fixture {
        store: InMemoryStore,
        story: Story,
        drafts: Vec<TextGeneration>,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let story = StoryRepository::create(
            &store,
            &NewStory {
                title: "The Fox".to_owned(),
                kind: "fable".to_owned(),
                plot: "a fox".to_owned(),
                teachings: "patience".to_owned(),
                other_notes: Some("gentle".to_owned()),
                duration_minutes: Some(5),
            },
        )
        .await
        .unwrap();
        let mut drafts = Vec::new();
        for text in ["draft one", "draft two"] {
            drafts.push(
                TextGenerationRepository::create(
                    &store,
                    &NewTextGeneration {
                        story_id: story.id,
                        full_text: text.to_owned(),
                        plot: None,
                        teachings: None,
                        duration_minutes: None,
                        provider: None,
                        model: None,
                    },
                )
                .await
                .unwrap(),
            );
        }
        Fixture {
            store,
            story,
            drafts,
        }
    }

    fn edit(id: i64, full_text: &str, duration_minutes: Option<i32>) -> TextGenerationEdit {
        TextGenerationEdit {
            id,
            full_text: full_text.to_owned(),
            plot: None,
            teachings: None,
            duration_minutes,
        }
    }

    fn command(story_id: i64, final_id: i64, edits: Vec<TextGenerationEdit>) -> FinalizeStory {
        FinalizeStory {
            correlation_id: Uuid::new_v4(),
            story_id,
            final_text_generation_id: final_id,
            text_generations: edits,
            voice_name: Some("alloy".to_owned()),
            provider: None,
        }
    }

    async fn finalize(
        store: &InMemoryStore,
        audio_generator: &dyn AudioGenerator,
        command: &FinalizeStory,
    ) -> Result<StoryDetails, DomainError> {
        handle_finalize_story(
            command,
            StoryRepositories::from_store(store),
            FinalizeServices {
                store,
                audio_generator,
            },
        )
        .await
    }

    async fn reload(store: &InMemoryStore, story_id: i64) -> StoryDetails {
        get_story(story_id, StoryRepositories::from_store(store))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_finalize_promotes_text_and_audio() {
        // Arrange
        let Fixture {
            store,
            story,
            drafts,
        } = fixture().await;
        let audio = StubAudioGenerator::new("file-42", Some(240));
        let final_id = drafts[1].id;
        let command = command(
            story.id,
            final_id,
            vec![edit(final_id, "polished two", Some(8)), edit(drafts[0].id, "touched one", None)],
        );

        // Act
        let details = finalize(&store, &audio, &command).await.unwrap();

        // Assert
        assert_eq!(details.story.final_text_generation_id, Some(final_id));
        assert_eq!(details.story.duration_minutes, Some(8));
        assert_eq!(details.audio_generations.len(), 1);
        let rendered = &details.audio_generations[0];
        assert_eq!(details.story.final_audio_generation_id, Some(rendered.id));
        assert_eq!(rendered.audio_file_id, "file-42");
        assert_eq!(rendered.duration_seconds, Some(240));
        assert_eq!(rendered.text_generation_id, final_id);
        assert_eq!(rendered.voice_name.as_deref(), Some("alloy"));
        assert_eq!(rendered.provider.as_deref(), Some("stub-voice"));

        let texts: Vec<&str> = details
            .text_generations
            .iter()
            .map(|g| g.full_text.as_str())
            .collect();
        assert_eq!(texts, vec!["polished two", "touched one"]);
        assert_eq!(store.committed_transactions(), 1);
    }

    #[tokio::test]
    async fn test_finalize_sends_edited_text_to_audio_provider() {
        // Arrange
        let Fixture {
            store,
            story,
            drafts,
        } = fixture().await;
        let audio = StubAudioGenerator::default();
        let mut command = command(
            story.id,
            drafts[0].id,
            vec![edit(drafts[0].id, "final words", Some(7))],
        );
        command.provider = Some("studio".to_owned());

        // Act
        let details = finalize(&store, &audio, &command).await.unwrap();

        // Assert
        let requests = audio.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].full_text, "final words");
        assert_eq!(requests[0].duration_minutes, Some(7));
        assert_eq!(requests[0].other_notes.as_deref(), Some("gentle"));
        assert_eq!(requests[0].voice_name.as_deref(), Some("alloy"));
        assert_eq!(requests[0].provider.as_deref(), Some("studio"));
        assert_eq!(
            details.audio_generations[0].provider.as_deref(),
            Some("studio")
        );
    }

    #[tokio::test]
    async fn test_finalize_without_text_duration_keeps_story_duration() {
        let Fixture {
            store,
            story,
            drafts,
        } = fixture().await;
        let audio = StubAudioGenerator::default();

        let details = finalize(&store, &audio, &command(story.id, drafts[0].id, Vec::new()))
            .await
            .unwrap();

        assert_eq!(details.story.duration_minutes, Some(5));
        assert_eq!(audio.requests()[0].duration_minutes, Some(5));
    }

    #[tokio::test]
    async fn test_finalize_rejects_foreign_edit_without_side_effects() {
        // Arrange
        let Fixture {
            store,
            story,
            drafts,
        } = fixture().await;
        let other = StoryRepository::create(
            &store,
            &NewStory {
                title: "Other".to_owned(),
                kind: "fable".to_owned(),
                plot: "p".to_owned(),
                teachings: "t".to_owned(),
                other_notes: None,
                duration_minutes: None,
            },
        )
        .await
        .unwrap();
        let foreign = TextGenerationRepository::create(
            &store,
            &NewTextGeneration {
                story_id: other.id,
                full_text: "not yours".to_owned(),
                plot: None,
                teachings: None,
                duration_minutes: None,
                provider: None,
                model: None,
            },
        )
        .await
        .unwrap();
        let before = reload(&store, story.id).await;
        let audio = StubAudioGenerator::default();
        let command = command(
            story.id,
            drafts[0].id,
            vec![edit(drafts[0].id, "changed", None), edit(foreign.id, "hijack", None)],
        );

        // Act
        let result = finalize(&store, &audio, &command).await;

        // Assert
        match result.unwrap_err() {
            DomainError::Validation(msg) => assert_eq!(
                msg,
                format!("Text generation {} does not belong to this story", foreign.id)
            ),
            other => panic!("expected Validation, got {other:?}"),
        }
        assert_eq!(reload(&store, story.id).await, before);
        assert!(audio.requests().is_empty());
        assert_eq!(store.begun_transactions(), 0);
    }

    #[tokio::test]
    async fn test_finalize_rejects_unknown_story_and_final_text() {
        let Fixture {
            store,
            story,
            drafts,
        } = fixture().await;
        let audio = StubAudioGenerator::default();

        let missing_story = finalize(&store, &audio, &command(999, drafts[0].id, Vec::new())).await;
        let missing_text = finalize(&store, &audio, &command(story.id, 999, Vec::new())).await;

        match missing_story.unwrap_err() {
            DomainError::NotFound(msg) => assert_eq!(msg, "Story not found"),
            other => panic!("expected NotFound, got {other:?}"),
        }
        match missing_text.unwrap_err() {
            DomainError::NotFound(msg) => assert_eq!(msg, "Final text generation not found"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_finalize_rejects_empty_edit_text() {
        let Fixture {
            store,
            story,
            drafts,
        } = fixture().await;
        let audio = StubAudioGenerator::default();

        let result = finalize(
            &store,
            &audio,
            &command(story.id, drafts[0].id, vec![edit(drafts[1].id, "", None)]),
        )
        .await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(audio.requests().is_empty());
    }

    #[tokio::test]
    async fn test_finalize_rejects_over_long_overrides_before_rendering() {
        // Arrange
        let Fixture {
            store,
            story,
            drafts,
        } = fixture().await;
        let audio = StubAudioGenerator::default();
        let mut long_provider = command(story.id, drafts[0].id, Vec::new());
        long_provider.provider = Some("p".repeat(60));
        let mut long_voice = command(story.id, drafts[0].id, Vec::new());
        long_voice.voice_name = Some("v".repeat(101));

        // Act
        let provider_result = finalize(&store, &audio, &long_provider).await;
        let voice_result = finalize(&store, &audio, &long_voice).await;

        // Assert
        match provider_result {
            Err(DomainError::Validation(message)) => {
                assert_eq!(message, "provider must be at most 50 characters");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        assert!(matches!(voice_result, Err(DomainError::Validation(_))));
        assert!(audio.requests().is_empty());
        assert_eq!(store.begun_transactions(), 0);
        assert_eq!(reload(&store, story.id).await.story, story);
    }

    #[tokio::test]
    async fn test_finalize_audio_failure_changes_nothing() {
        // Arrange
        let Fixture {
            store,
            story,
            drafts,
        } = fixture().await;
        StoryRepository::update_final_generations(&store, story.id, Some(drafts[1].id), None)
            .await
            .unwrap();
        let before = reload(&store, story.id).await;
        let audio = FailingAudioGenerator::default();
        let command = command(
            story.id,
            drafts[0].id,
            vec![edit(drafts[0].id, "edited", Some(9))],
        );

        // Act
        let result = finalize(&store, &audio, &command).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Upstream(_))));
        assert_eq!(audio.calls(), 1);
        let after = reload(&store, story.id).await;
        assert_eq!(after, before);
        assert_eq!(after.story.final_text_generation_id, Some(drafts[1].id));
        assert_eq!(store.begun_transactions(), 0);
    }

    #[tokio::test]
    async fn test_finalize_storage_failure_rolls_back_edits() {
        // Arrange
        let Fixture {
            store,
            story,
            drafts,
        } = fixture().await;
        let before = reload(&store, story.id).await;
        let failing = store.with_failing_audio_insert();
        let audio = StubAudioGenerator::default();
        let command = command(
            story.id,
            drafts[0].id,
            vec![edit(drafts[0].id, "edited", Some(9))],
        );

        // Act
        let result = finalize(&failing, &audio, &command).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Storage(_))));
        assert_eq!(audio.requests().len(), 1);
        assert_eq!(store.begun_transactions(), 1);
        assert_eq!(store.committed_transactions(), 0);
        assert_eq!(reload(&store, story.id).await, before);
    }
}
