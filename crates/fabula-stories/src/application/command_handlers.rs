//! Command handlers for the story context.
//!
//! Each handler validates existence and ownership before touching storage.
//! Only story creation talks to a generation provider here; finalization
//! lives in [`crate::application::finalize`].

use fabula_core::command::Command;
use fabula_core::error::DomainError;
use fabula_core::generation::{TextGenerationRequest, TextGenerator};
use fabula_core::model::{
    AudioGeneration, NewAudioGeneration, NewTextGeneration, Story, StoryDetails, TextGeneration,
};
use tracing::{info, instrument, warn};

use crate::application::StoryRepositories;
use crate::application::query_handlers::require_story;
use crate::domain::commands::{
    CreateAudioGeneration, CreateStory, CreateTextGeneration, DeleteStory, SetFinalGenerations,
    UpdateStory,
};

/// Handles the `CreateStory` command: persists the story, then asks the text
/// provider for candidates and stores them.
///
/// Generation is best-effort. A provider or storage failure after the story
/// row exists is logged and yields an empty `text_generations` list.
///
/// # Errors
///
/// Returns `DomainError::Storage` only if the story itself cannot be created.
#[instrument(
    skip(command, repos, text_generator),
    fields(correlation_id = %command.correlation_id(), command_type = command.command_type())
)]
pub async fn handle_create_story(
    command: &CreateStory,
    repos: StoryRepositories<'_>,
    text_generator: &dyn TextGenerator,
) -> Result<StoryDetails, DomainError> {
    let story = repos.stories.create(&command.story).await?;
    info!(story_id = story.id, "story created");

    let text_generations = generate_candidates(&story, repos, text_generator).await;

    Ok(StoryDetails {
        story,
        text_generations,
        audio_generations: Vec::new(),
    })
}

async fn generate_candidates(
    story: &Story,
    repos: StoryRepositories<'_>,
    text_generator: &dyn TextGenerator,
) -> Vec<TextGeneration> {
    let request = TextGenerationRequest::from(story);
    let generated = match text_generator.generate_text(&request).await {
        Ok(generated) => generated,
        Err(e) => {
            warn!(story_id = story.id, error = %e, "text generation failed, story kept without candidates");
            return Vec::new();
        }
    };

    let candidates: Vec<NewTextGeneration> = generated
        .into_iter()
        .map(|g| NewTextGeneration {
            story_id: story.id,
            full_text: g.generated_text,
            plot: Some(story.plot.clone()),
            teachings: Some(story.teachings.clone()),
            duration_minutes: story.duration_minutes,
            provider: text_generator.provider_name().map(str::to_owned),
            model: text_generator.model_name().map(str::to_owned),
        })
        .collect();

    match repos.text_generations.create_batch(&candidates).await {
        Ok(mut created) => {
            // Inserted oldest first; lists are newest first.
            created.reverse();
            info!(story_id = story.id, count = created.len(), "text candidates stored");
            created
        }
        Err(e) => {
            warn!(story_id = story.id, error = %e, "storing text candidates failed, story kept without candidates");
            Vec::new()
        }
    }
}

/// Handles the `UpdateStory` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if no field would change.
/// Returns `DomainError::NotFound` if the story does not exist.
#[instrument(skip(command, repos), fields(story_id = command.story_id))]
pub async fn handle_update_story(
    command: &UpdateStory,
    repos: StoryRepositories<'_>,
) -> Result<Story, DomainError> {
    if command.changes.is_empty() {
        return Err(DomainError::Validation(
            "No data provided for update".to_owned(),
        ));
    }
    repos
        .stories
        .update(command.story_id, &command.changes)
        .await?
        .ok_or_else(DomainError::story_not_found)
}

/// Handles the `DeleteStory` command. Generations go with the story.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist.
/// Returns `DomainError::Storage` if the row survives the delete.
#[instrument(skip(command, repos), fields(story_id = command.story_id))]
pub async fn handle_delete_story(
    command: &DeleteStory,
    repos: StoryRepositories<'_>,
) -> Result<(), DomainError> {
    require_story(command.story_id, repos).await?;
    if repos.stories.delete(command.story_id).await? {
        info!("story deleted");
        Ok(())
    } else {
        Err(DomainError::Storage("Unable to delete story".to_owned()))
    }
}

/// Handles the `SetFinalGenerations` command: checks that each supplied
/// generation exists and belongs to the story, then records it.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story or a referenced generation
/// does not exist.
/// Returns `DomainError::Validation` if a generation belongs to another story.
#[instrument(skip(command, repos), fields(story_id = command.story_id))]
pub async fn handle_set_final_generations(
    command: &SetFinalGenerations,
    repos: StoryRepositories<'_>,
) -> Result<Story, DomainError> {
    let story_id = command.story_id;
    require_story(story_id, repos).await?;

    if let Some(id) = command.final_text_generation_id {
        if repos.text_generations.find(id).await?.is_none() {
            return Err(DomainError::NotFound("Text generation not found".to_owned()));
        }
        if !repos.text_generations.belongs_to_story(id, story_id).await? {
            return Err(DomainError::Validation(
                "Text generation does not belong to this story".to_owned(),
            ));
        }
    }

    if let Some(id) = command.final_audio_generation_id {
        if repos.audio_generations.find(id).await?.is_none() {
            return Err(DomainError::NotFound("Audio generation not found".to_owned()));
        }
        if !repos.audio_generations.belongs_to_story(id, story_id).await? {
            return Err(DomainError::Validation(
                "Audio generation does not belong to this story".to_owned(),
            ));
        }
    }

    repos
        .stories
        .update_final_generations(
            story_id,
            command.final_text_generation_id,
            command.final_audio_generation_id,
        )
        .await?
        .ok_or_else(|| DomainError::Storage("Unable to update story".to_owned()))
}

/// Handles the `CreateTextGeneration` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist.
#[instrument(skip(command, repos), fields(story_id = command.story_id))]
pub async fn handle_create_text_generation(
    command: &CreateTextGeneration,
    repos: StoryRepositories<'_>,
) -> Result<TextGeneration, DomainError> {
    require_story(command.story_id, repos).await?;
    repos
        .text_generations
        .create(&NewTextGeneration {
            story_id: command.story_id,
            full_text: command.full_text.clone(),
            plot: command.plot.clone(),
            teachings: command.teachings.clone(),
            duration_minutes: command.duration_minutes,
            provider: command.provider.clone(),
            model: command.model.clone(),
        })
        .await
}

/// Handles the `CreateAudioGeneration` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story or the text generation does
/// not exist.
/// Returns `DomainError::Validation` if the text generation belongs to
/// another story.
#[instrument(skip(command, repos), fields(story_id = command.story_id))]
pub async fn handle_create_audio_generation(
    command: &CreateAudioGeneration,
    repos: StoryRepositories<'_>,
) -> Result<AudioGeneration, DomainError> {
    require_story(command.story_id, repos).await?;

    let text = repos
        .text_generations
        .find(command.text_generation_id)
        .await?
        .ok_or_else(|| DomainError::NotFound("Text generation not found".to_owned()))?;
    if text.story_id != command.story_id {
        return Err(DomainError::Validation(
            "Text generation does not belong to this story".to_owned(),
        ));
    }

    repos
        .audio_generations
        .create(&NewAudioGeneration {
            story_id: command.story_id,
            text_generation_id: text.id,
            audio_file_id: command.audio_file_id.clone(),
            duration_seconds: command.duration_seconds,
            voice_name: command.voice_name.clone(),
            provider: command.provider.clone(),
        })
        .await
}

#[cfg(test)]
mod tests {
    use fabula_core::error::DomainError;
    use fabula_core::model::{NewStory, StoryChanges};
    use fabula_core::repository::{
        AudioGenerationRepository, StoryRepository, TextGenerationRepository,
    };
    use fabula_test_support::{FailingStore, FailingTextGenerator, InMemoryStore, StubTextGenerator};
    use uuid::Uuid;

    use super::*;

    fn new_story(title: &str) -> NewStory {
        NewStory {
            title: title.to_owned(),
            kind: "fable".to_owned(),
            plot: "p".to_owned(),
            teachings: "t".to_owned(),
            other_notes: None,
            duration_minutes: Some(5),
        }
    }

    fn create_command() -> CreateStory {
        CreateStory {
            correlation_id: Uuid::new_v4(),
            story: NewStory {
                duration_minutes: None,
                ..new_story("A")
            },
        }
    }

    async fn seed_text(store: &InMemoryStore, story_id: i64) -> TextGeneration {
        TextGenerationRepository::create(
            store,
            &NewTextGeneration {
                story_id,
                full_text: "draft".to_owned(),
                plot: None,
                teachings: None,
                duration_minutes: None,
                provider: None,
                model: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_story_stores_three_candidates() {
        // Arrange
        let store = InMemoryStore::new();
        let generator = StubTextGenerator::three();

        // Act
        let details = handle_create_story(
            &create_command(),
            StoryRepositories::from_store(&store),
            &generator,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(details.text_generations.len(), 3);
        assert!(
            details
                .text_generations
                .iter()
                .all(|g| !g.full_text.is_empty() && g.story_id == details.story.id)
        );
        assert_eq!(details.text_generations[0].full_text, "third draft");
        assert_eq!(details.text_generations[0].provider.as_deref(), Some("stub"));
        assert_eq!(details.text_generations[0].model.as_deref(), Some("stub-model"));
        assert_eq!(details.text_generations[0].plot.as_deref(), Some("p"));
        assert!(details.audio_generations.is_empty());

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].title, "A");
        assert_eq!(requests[0].kind, "fable");
    }

    #[tokio::test]
    async fn test_create_story_survives_generation_failure() {
        // Arrange
        let store = InMemoryStore::new();

        // Act
        let details = handle_create_story(
            &create_command(),
            StoryRepositories::from_store(&store),
            &FailingTextGenerator,
        )
        .await
        .unwrap();

        // Assert
        assert!(details.text_generations.is_empty());
        let persisted = StoryRepository::find(&store, details.story.id).await.unwrap();
        assert!(persisted.is_some());
    }

    #[tokio::test]
    async fn test_create_story_fails_when_story_cannot_be_stored() {
        let store = FailingStore;
        let generator = StubTextGenerator::three();

        let result = handle_create_story(
            &create_command(),
            StoryRepositories::from_store(&store),
            &generator,
        )
        .await;

        assert!(matches!(result, Err(DomainError::Storage(_))));
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_story_rejects_empty_changes() {
        let store = InMemoryStore::new();
        let story = StoryRepository::create(&store, &new_story("A")).await.unwrap();
        let command = UpdateStory {
            correlation_id: Uuid::new_v4(),
            story_id: story.id,
            changes: StoryChanges::default(),
        };

        let result = handle_update_story(&command, StoryRepositories::from_store(&store)).await;

        match result.unwrap_err() {
            DomainError::Validation(msg) => assert_eq!(msg, "No data provided for update"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_story_applies_partial_changes() {
        // Arrange
        let store = InMemoryStore::new();
        let story = StoryRepository::create(&store, &new_story("A")).await.unwrap();
        let command = UpdateStory {
            correlation_id: Uuid::new_v4(),
            story_id: story.id,
            changes: StoryChanges {
                title: Some("B".to_owned()),
                other_notes: Some(Some("calm".to_owned())),
                ..StoryChanges::default()
            },
        };

        // Act
        let updated = handle_update_story(&command, StoryRepositories::from_store(&store))
            .await
            .unwrap();

        // Assert
        assert_eq!(updated.title, "B");
        assert_eq!(updated.other_notes.as_deref(), Some("calm"));
        assert_eq!(updated.plot, "p");
        assert!(updated.updated_at > story.updated_at);
    }

    #[tokio::test]
    async fn test_update_story_returns_not_found_for_unknown_id() {
        let store = InMemoryStore::new();
        let command = UpdateStory {
            correlation_id: Uuid::new_v4(),
            story_id: 9,
            changes: StoryChanges {
                title: Some("B".to_owned()),
                ..StoryChanges::default()
            },
        };

        let result = handle_update_story(&command, StoryRepositories::from_store(&store)).await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_story_cascades_to_generations() {
        // Arrange
        let store = InMemoryStore::new();
        let details = handle_create_story(
            &create_command(),
            StoryRepositories::from_store(&store),
            &StubTextGenerator::three(),
        )
        .await
        .unwrap();
        let story_id = details.story.id;
        let command = DeleteStory {
            correlation_id: Uuid::new_v4(),
            story_id,
        };

        // Act
        handle_delete_story(&command, StoryRepositories::from_store(&store))
            .await
            .unwrap();

        // Assert
        assert!(
            TextGenerationRepository::find_by_story_id(&store, story_id)
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            AudioGenerationRepository::find_by_story_id(&store, story_id)
                .await
                .unwrap()
                .is_empty()
        );
        let again = handle_delete_story(&command, StoryRepositories::from_store(&store)).await;
        assert!(matches!(again, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_final_generations_rejects_foreign_text() {
        // Arrange
        let store = InMemoryStore::new();
        let owner = StoryRepository::create(&store, &new_story("owner")).await.unwrap();
        let other = StoryRepository::create(&store, &new_story("other")).await.unwrap();
        let text = seed_text(&store, other.id).await;
        let command = SetFinalGenerations {
            correlation_id: Uuid::new_v4(),
            story_id: owner.id,
            final_text_generation_id: Some(text.id),
            final_audio_generation_id: None,
        };

        // Act
        let result =
            handle_set_final_generations(&command, StoryRepositories::from_store(&store)).await;

        // Assert
        match result.unwrap_err() {
            DomainError::Validation(msg) => {
                assert_eq!(msg, "Text generation does not belong to this story");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
        let reloaded = StoryRepository::find(&store, owner.id).await.unwrap().unwrap();
        assert_eq!(reloaded.final_text_generation_id, None);
    }

    #[tokio::test]
    async fn test_set_final_generations_reports_missing_audio() {
        let store = InMemoryStore::new();
        let story = StoryRepository::create(&store, &new_story("A")).await.unwrap();
        let command = SetFinalGenerations {
            correlation_id: Uuid::new_v4(),
            story_id: story.id,
            final_text_generation_id: None,
            final_audio_generation_id: Some(77),
        };

        let result =
            handle_set_final_generations(&command, StoryRepositories::from_store(&store)).await;

        match result.unwrap_err() {
            DomainError::NotFound(msg) => assert_eq!(msg, "Audio generation not found"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_set_final_generations_records_owned_text() {
        let store = InMemoryStore::new();
        let story = StoryRepository::create(&store, &new_story("A")).await.unwrap();
        let text = seed_text(&store, story.id).await;
        let command = SetFinalGenerations {
            correlation_id: Uuid::new_v4(),
            story_id: story.id,
            final_text_generation_id: Some(text.id),
            final_audio_generation_id: None,
        };

        let updated = handle_set_final_generations(&command, StoryRepositories::from_store(&store))
            .await
            .unwrap();

        assert_eq!(updated.final_text_generation_id, Some(text.id));
        assert_eq!(updated.final_audio_generation_id, None);
    }

    #[tokio::test]
    async fn test_create_text_generation_requires_story() {
        let store = InMemoryStore::new();
        let command = CreateTextGeneration {
            correlation_id: Uuid::new_v4(),
            story_id: 3,
            full_text: "x".to_owned(),
            plot: None,
            teachings: None,
            duration_minutes: None,
            provider: None,
            model: None,
        };

        let result =
            handle_create_text_generation(&command, StoryRepositories::from_store(&store)).await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_audio_generation_checks_text_ownership() {
        // Arrange
        let store = InMemoryStore::new();
        let owner = StoryRepository::create(&store, &new_story("owner")).await.unwrap();
        let other = StoryRepository::create(&store, &new_story("other")).await.unwrap();
        let foreign = seed_text(&store, other.id).await;
        let own = seed_text(&store, owner.id).await;
        let command = |text_generation_id| CreateAudioGeneration {
            correlation_id: Uuid::new_v4(),
            story_id: owner.id,
            text_generation_id,
            audio_file_id: "file-1".to_owned(),
            duration_seconds: Some(30),
            voice_name: None,
            provider: None,
        };
        let repos = StoryRepositories::from_store(&store);

        // Act
        let foreign_result = handle_create_audio_generation(&command(foreign.id), repos).await;
        let missing_result = handle_create_audio_generation(&command(999), repos).await;
        let created = handle_create_audio_generation(&command(own.id), repos)
            .await
            .unwrap();

        // Assert
        assert!(matches!(foreign_result, Err(DomainError::Validation(_))));
        assert!(matches!(missing_result, Err(DomainError::NotFound(_))));
        assert_eq!(created.text_generation_id, own.id);
        assert_eq!(created.duration_seconds, Some(30));
    }
}
