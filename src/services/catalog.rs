//! Game catalog service: games, their instances and availability

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        account::AccountClaims,
        borrow_request::check_date_range,
        game::{
            Availability, AvailabilityQuery, CreateGame, CreateGameInstance, Game, GameInstance,
            GameQuery, GameRating, UpdateGame, UpdateGameInstance,
        },
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

fn require_game_owner(game: &Game, claims: &AccountClaims) -> AppResult<()> {
    if game.owner_id != claims.account_id {
        return Err(AppError::Authorization(format!(
            "Only the owner of game {} can do this",
            game.id
        )));
    }
    Ok(())
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn search_games(&self, query: &GameQuery) -> AppResult<(Vec<Game>, i64)> {
        self.repository.games.list(query).await
    }

    pub async fn get_game(&self, id: i32) -> AppResult<Game> {
        self.repository.games.get_by_id(id).await
    }

    /// Add a game; only accounts with the game owner capability may
    pub async fn create_game(&self, claims: &AccountClaims, game: CreateGame) -> AppResult<Game> {
        game.validate()?;

        let account = self.repository.accounts.get_by_id(claims.account_id).await?;
        if !account.is_game_owner {
            return Err(AppError::Authorization(
                "Only game owners can add games".to_string(),
            ));
        }

        let created = self.repository.games.create(account.id, &game).await?;
        tracing::info!("Game {} '{}' added by account {}", created.id, created.name, account.id);
        Ok(created)
    }

    pub async fn update_game(&self, claims: &AccountClaims, id: i32, update: UpdateGame) -> AppResult<Game> {
        update.validate()?;

        let current = self.repository.games.get_by_id(id).await?;
        require_game_owner(&current, claims)?;
        update
            .check_player_range(&current)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        self.repository.games.update(id, &update).await
    }

    /// Delete a game once nothing depends on it any more
    pub async fn delete_game(&self, claims: &AccountClaims, id: i32) -> AppResult<()> {
        let game = self.repository.games.get_by_id(id).await?;
        require_game_owner(&game, claims)?;

        let open = self.repository.lending_records.count_open_for_game(id).await?;
        if open > 0 {
            return Err(AppError::InvalidOperation(format!(
                "Game {} has {} lending record(s) in progress",
                id, open
            )));
        }
        let upcoming = self.repository.events.count_upcoming_for_game(id).await?;
        if upcoming > 0 {
            return Err(AppError::InvalidOperation(format!(
                "Game {} is featured in {} upcoming event(s)",
                id, upcoming
            )));
        }

        self.repository.games.delete(id).await?;
        tracing::info!("Game {} deleted by account {}", id, claims.account_id);
        Ok(())
    }

    pub async fn rating(&self, game_id: i32) -> AppResult<GameRating> {
        self.repository.games.get_by_id(game_id).await?;
        self.repository.games.rating(game_id).await
    }

    pub async fn list_instances(&self, game_id: i32) -> AppResult<Vec<GameInstance>> {
        self.repository.games.get_by_id(game_id).await?;
        self.repository.games.list_instances(game_id).await
    }

    /// Get an instance, checking that it is a copy of `game_id`
    pub async fn get_instance(&self, game_id: i32, instance_id: i32) -> AppResult<GameInstance> {
        let instance = self.repository.games.get_instance(instance_id).await?;
        if instance.game_id != game_id {
            return Err(AppError::NotFound(format!(
                "Game instance {} does not belong to game {}",
                instance_id, game_id
            )));
        }
        Ok(instance)
    }

    /// Register a copy of a game owned by the caller
    pub async fn create_instance(
        &self,
        claims: &AccountClaims,
        game_id: i32,
        instance: CreateGameInstance,
    ) -> AppResult<GameInstance> {
        instance.validate()?;

        let game = self.repository.games.get_by_id(game_id).await?;
        require_game_owner(&game, claims)?;

        let created = self
            .repository
            .games
            .create_instance(game_id, claims.account_id, &instance)
            .await?;
        tracing::info!("Instance {} of game {} created", created.id, game_id);
        Ok(created)
    }

    pub async fn update_instance(
        &self,
        claims: &AccountClaims,
        game_id: i32,
        instance_id: i32,
        update: UpdateGameInstance,
    ) -> AppResult<GameInstance> {
        update.validate()?;

        let instance = self.get_instance(game_id, instance_id).await?;
        if instance.owner_id != claims.account_id {
            return Err(AppError::Authorization(
                "Only the owner of this copy can modify it".to_string(),
            ));
        }
        self.repository.games.update_instance(instance_id, &update).await
    }

    pub async fn delete_instance(&self, claims: &AccountClaims, game_id: i32, instance_id: i32) -> AppResult<()> {
        let instance = self.get_instance(game_id, instance_id).await?;
        if instance.owner_id != claims.account_id {
            return Err(AppError::Authorization(
                "Only the owner of this copy can delete it".to_string(),
            ));
        }
        self.repository.games.delete_instance(instance_id).await?;
        tracing::info!("Instance {} of game {} deleted", instance_id, game_id);
        Ok(())
    }

    /// Whether a game (or one of its copies) is free over a date range
    pub async fn availability(&self, game_id: i32, query: &AvailabilityQuery) -> AppResult<Availability> {
        check_date_range(query.start_date, query.end_date).map_err(AppError::Validation)?;
        self.repository.games.get_by_id(game_id).await?;

        let mut instance_available = true;
        if let Some(instance_id) = query.instance_id {
            instance_available = self.get_instance(game_id, instance_id).await?.available;
        }

        let conflicting_requests = self
            .repository
            .borrow_requests
            .find_conflicts(game_id, query.instance_id, query.start_date, query.end_date)
            .await?;

        Ok(Availability {
            game_id,
            instance_id: query.instance_id,
            start_date: query.start_date,
            end_date: query.end_date,
            available: instance_available && conflicting_requests.is_empty(),
            conflicting_requests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_require_game_owner() {
        let game = Game {
            id: 4,
            name: "Azul".to_string(),
            min_players: 2,
            max_players: 4,
            image: None,
            category: None,
            description: None,
            date_added: Utc::now(),
            owner_id: 10,
        };
        let claims = |account_id| AccountClaims {
            sub: "x@example.com".to_string(),
            account_id,
            jti: "j".to_string(),
            exp: 0,
            iat: 0,
        };
        assert!(require_game_owner(&game, &claims(10)).is_ok());
        assert!(matches!(
            require_game_owner(&game, &claims(11)),
            Err(AppError::Authorization(_))
        ));
    }
}
