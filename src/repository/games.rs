//! Games and game instances repository

use chrono::Utc;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        game::{
            CreateGame, CreateGameInstance, Game, GameInstance, GameQuery, GameRating,
            UpdateGame, UpdateGameInstance,
        },
        page_bounds,
    },
};

#[derive(Clone)]
pub struct GamesRepository {
    pool: Pool<Postgres>,
}

fn push_game_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &GameQuery) {
    builder.push(" WHERE 1=1");
    if let Some(ref name) = query.name {
        builder.push(" AND name ILIKE ").push_bind(format!("%{}%", name));
    }
    if let Some(ref category) = query.category {
        builder.push(" AND LOWER(category) = LOWER(").push_bind(category.clone()).push(")");
    }
    if let Some(players) = query.players {
        builder
            .push(" AND min_players <= ")
            .push_bind(players)
            .push(" AND max_players >= ")
            .push_bind(players);
    }
    if let Some(owner_id) = query.owner_id {
        builder.push(" AND owner_id = ").push_bind(owner_id);
    }
}

impl GamesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Search games with filters and pagination
    pub async fn list(&self, query: &GameQuery) -> AppResult<(Vec<Game>, i64)> {
        let (_, size, offset) = page_bounds(query.page, query.size);

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM games");
        push_game_filters(&mut count, query);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::new("SELECT * FROM games");
        push_game_filters(&mut select, query);
        select
            .push(" ORDER BY name, id LIMIT ")
            .push_bind(size)
            .push(" OFFSET ")
            .push_bind(offset);
        let games = select.build_query_as::<Game>().fetch_all(&self.pool).await?;

        Ok((games, total))
    }

    /// Get game by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Game> {
        sqlx::query_as::<_, Game>("SELECT * FROM games WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game with id {} not found", id)))
    }

    /// Create a game owned by `owner_id`
    pub async fn create(&self, owner_id: i32, game: &CreateGame) -> AppResult<Game> {
        let created = sqlx::query_as::<_, Game>(
            r#"
            INSERT INTO games (name, min_players, max_players, image, category, description, date_added, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(game.name.trim())
        .bind(game.min_players)
        .bind(game.max_players)
        .bind(&game.image)
        .bind(&game.category)
        .bind(&game.description)
        .bind(Utc::now())
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Update provided fields of a game
    pub async fn update(&self, id: i32, game: &UpdateGame) -> AppResult<Game> {
        sqlx::query_as::<_, Game>(
            r#"
            UPDATE games
            SET name = COALESCE($2, name),
                min_players = COALESCE($3, min_players),
                max_players = COALESCE($4, max_players),
                image = COALESCE($5, image),
                category = COALESCE($6, category),
                description = COALESCE($7, description)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(game.name.as_deref().map(str::trim))
        .bind(game.min_players)
        .bind(game.max_players)
        .bind(&game.image)
        .bind(&game.category)
        .bind(&game.description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Game with id {} not found", id)))
    }

    /// Delete a game. Reviews, instances, borrow requests (with their lending
    /// records) and events featuring it are removed by ON DELETE CASCADE.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Game with id {} not found", id)));
        }
        Ok(())
    }

    /// Average rating and review count
    pub async fn rating(&self, game_id: i32) -> AppResult<GameRating> {
        let rating = sqlx::query_as::<_, GameRating>(
            r#"
            SELECT $1::int AS game_id, AVG(rating)::float8 AS average, COUNT(*) AS count
            FROM reviews
            WHERE game_id = $1
            "#,
        )
        .bind(game_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(rating)
    }

    /// List the copies of a game
    pub async fn list_instances(&self, game_id: i32) -> AppResult<Vec<GameInstance>> {
        let instances = sqlx::query_as::<_, GameInstance>(
            "SELECT * FROM game_instances WHERE game_id = $1 ORDER BY id",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(instances)
    }

    /// Get game instance by ID
    pub async fn get_instance(&self, id: i32) -> AppResult<GameInstance> {
        sqlx::query_as::<_, GameInstance>("SELECT * FROM game_instances WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Game instance with id {} not found", id)))
    }

    /// Register a copy of `game_id` owned by `owner_id`
    pub async fn create_instance(
        &self,
        game_id: i32,
        owner_id: i32,
        instance: &CreateGameInstance,
    ) -> AppResult<GameInstance> {
        let created = sqlx::query_as::<_, GameInstance>(
            r#"
            INSERT INTO game_instances (game_id, owner_id, condition, available, location, name, acquired_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(game_id)
        .bind(owner_id)
        .bind(&instance.condition)
        .bind(instance.available.unwrap_or(true))
        .bind(&instance.location)
        .bind(&instance.name)
        .bind(instance.acquired_date.unwrap_or_else(Utc::now))
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Update provided fields of a game instance
    pub async fn update_instance(
        &self,
        id: i32,
        instance: &UpdateGameInstance,
    ) -> AppResult<GameInstance> {
        sqlx::query_as::<_, GameInstance>(
            r#"
            UPDATE game_instances
            SET condition = COALESCE($2, condition),
                available = COALESCE($3, available),
                location = COALESCE($4, location),
                name = COALESCE($5, name)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&instance.condition)
        .bind(instance.available)
        .bind(&instance.location)
        .bind(&instance.name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Game instance with id {} not found", id)))
    }

    /// Delete a game instance; requests and events keep their game link
    pub async fn delete_instance(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM game_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Game instance with id {} not found", id)));
        }
        Ok(())
    }
}
