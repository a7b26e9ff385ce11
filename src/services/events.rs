//! Events service: events and capacity-bounded registrations

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        account::AccountClaims,
        event::{CreateEvent, Event, EventQuery, UpdateEvent},
        registration::{Registration, RegistrationQuery},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct EventsService {
    repository: Repository,
}

fn require_host(event: &Event, claims: &AccountClaims) -> AppResult<()> {
    if event.host_id != claims.account_id {
        return Err(AppError::Authorization(
            "Only the host can modify this event".to_string(),
        ));
    }
    Ok(())
}

impl EventsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &EventQuery) -> AppResult<(Vec<Event>, i64)> {
        self.repository.events.list(query).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Event> {
        self.repository.events.get_by_id(id).await
    }

    /// Check that an instance brought to an event is a copy of its featured game
    async fn check_instance(&self, game_id: i32, instance_id: Option<i32>) -> AppResult<()> {
        if let Some(instance_id) = instance_id {
            let instance = self.repository.games.get_instance(instance_id).await?;
            if instance.game_id != game_id {
                return Err(AppError::BadRequest(format!(
                    "Game instance {} is not a copy of game {}",
                    instance_id, game_id
                )));
            }
        }
        Ok(())
    }

    /// Create an event hosted by the caller
    pub async fn create(&self, claims: &AccountClaims, event: CreateEvent) -> AppResult<Event> {
        event.validate()?;
        if event.date_time <= Utc::now() {
            return Err(AppError::BadRequest("Event date must be in the future".to_string()));
        }

        self.repository.games.get_by_id(event.featured_game_id).await?;
        self.check_instance(event.featured_game_id, event.game_instance_id).await?;

        let created = self.repository.events.create(claims.account_id, &event).await?;
        tracing::info!(
            "Event {} '{}' created by account {}",
            created.id,
            created.title,
            claims.account_id
        );
        Ok(created)
    }

    pub async fn update(&self, claims: &AccountClaims, id: Uuid, update: UpdateEvent) -> AppResult<Event> {
        update.validate()?;

        let current = self.repository.events.get_by_id(id).await?;
        require_host(&current, claims)?;

        if let Some(date_time) = update.date_time {
            if date_time <= Utc::now() {
                return Err(AppError::BadRequest("Event date must be in the future".to_string()));
            }
        }
        if let Some(max) = update.max_participants {
            if max < current.current_participants {
                return Err(AppError::BadRequest(format!(
                    "max_participants cannot be lower than the {} registered participants",
                    current.current_participants
                )));
            }
        }

        let game_id = update.featured_game_id.unwrap_or(current.featured_game_id);
        if update.featured_game_id.is_some() {
            self.repository.games.get_by_id(game_id).await?;
        }
        if update.clear_game_instance && update.game_instance_id.is_some() {
            return Err(AppError::BadRequest(
                "game_instance_id and clear_game_instance are mutually exclusive".to_string(),
            ));
        }
        self.check_instance(game_id, update.instance_after(current.game_instance_id))
            .await?;

        self.repository.events.update(id, &update).await
    }

    /// Delete an event; registrations go with it
    pub async fn delete(&self, claims: &AccountClaims, id: Uuid) -> AppResult<()> {
        let event = self.repository.events.get_by_id(id).await?;
        require_host(&event, claims)?;
        self.repository.events.delete(id).await?;
        tracing::info!("Event {} deleted", id);
        Ok(())
    }

    pub async fn list_registrations(&self, query: &RegistrationQuery) -> AppResult<(Vec<Registration>, i64)> {
        self.repository.registrations.list(query).await
    }

    pub async fn get_registration(&self, id: i32) -> AppResult<Registration> {
        self.repository.registrations.get_by_id(id).await
    }

    /// Register the caller to an event
    pub async fn register(&self, claims: &AccountClaims, event_id: Uuid) -> AppResult<Registration> {
        match self.repository.registrations.create(claims.account_id, event_id).await {
            Ok(registration) => {
                tracing::info!(
                    "Account {} registered to event {}",
                    claims.account_id,
                    event_id
                );
                Ok(registration)
            }
            Err(e) => {
                tracing::warn!(
                    "Registration of account {} to event {} rejected: {}",
                    claims.account_id,
                    event_id,
                    e
                );
                Err(e)
            }
        }
    }

    /// Move the caller's registration to another event
    pub async fn move_registration(
        &self,
        claims: &AccountClaims,
        id: i32,
        event_id: Uuid,
    ) -> AppResult<Registration> {
        let registration = self.repository.registrations.get_by_id(id).await?;
        if registration.attendee_id != claims.account_id {
            return Err(AppError::Authorization(
                "You can only move your own registrations".to_string(),
            ));
        }

        let moved = self.repository.registrations.move_to_event(id, event_id).await?;
        tracing::info!(
            "Registration {} moved from event {} to event {}",
            id,
            registration.event_id,
            event_id
        );
        Ok(moved)
    }

    /// Cancel a registration; allowed for the attendee and the event host
    pub async fn unregister(&self, claims: &AccountClaims, id: i32) -> AppResult<()> {
        let registration = self.repository.registrations.get_by_id(id).await?;
        if registration.attendee_id != claims.account_id {
            let event = self.repository.events.get_by_id(registration.event_id).await?;
            if event.host_id != claims.account_id {
                return Err(AppError::Authorization(
                    "Only the attendee or the event host can cancel this registration".to_string(),
                ));
            }
        }

        self.repository.registrations.delete(id).await?;
        tracing::info!(
            "Registration {} of account {} to event {} cancelled",
            id,
            registration.attendee_id,
            registration.event_id
        );
        Ok(())
    }
}
