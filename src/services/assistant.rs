//! assistant.rs
//!
//! Conversational assistant backed by an OpenAI-compatible chat API (Groq).
//!
//! Key components:
//! 1.  **GroqClient**: thin JSON client for the chat-completions endpoint,
//!     with typed request/response models and a typed error enum.
//! 2.  **Catalog tools**: the four database lookups the model may call
//!     (showtimes for a movie, movies at a cinema, movie details, history
//!     based recommendations). Tool calls are dispatched concurrently.
//! 3.  **Agent loop**: call 1 decides between chatting and calling tools;
//!     tool output is appended and call 2 summarizes it. Empty or not-found
//!     tool results are returned to the user verbatim, without a second
//!     call, so the model never gets a chance to invent showtimes.
//! 4.  **Selection extraction**: when the previous assistant turn listed
//!     showtimes, a JSON-mode call maps the user's answer ("the second
//!     one", "the 13:45 one") onto the structured rows carried in history.
//!
//! The assistant only reads: it never touches bookings or the seat ledger.

use chrono::{DateTime, FixedOffset};
use futures::future::join_all;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, warn};

use crate::config::AssistantConfig;
use crate::middleware::AuthUser;
use crate::services::dates;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    RequestFailed(String),

    #[error("assistant rate limited")]
    RateLimited,

    #[error("assistant api error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("assistant response could not be parsed: {0}")]
    ParseFailed(String),
}

/* ---------- wire types (OpenAI-compatible) ---------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text("assistant", content)
    }

    fn tool(tool_call_id: String, name: String, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: Some(tool_call_id),
            name: Some(name),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/* ---------- client ---------- */

#[derive(Clone)]
pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GroqClient {
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        }
    }

    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Option<Value>,
        tool_choice: Option<String>,
        response_format: Option<Value>,
    ) -> Result<ChatMessage, AssistantError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            tools,
            tool_choice,
            response_format,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::RequestFailed(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .json::<ChatCompletionResponse>()
                    .await
                    .map_err(|e| AssistantError::ParseFailed(e.to_string()))?;
                body.choices
                    .into_iter()
                    .next()
                    .map(|c| c.message)
                    .ok_or_else(|| AssistantError::ParseFailed("empty choices".to_string()))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(AssistantError::RateLimited),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(AssistantError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

/* ---------- tool schema ---------- */

fn tool_definitions() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": "get_showtimes_for_movie",
                "description": "Get showtimes for a MOVIE, filtered by DATE and (CITY or a SPECIFIC CINEMA).",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "movie_title": { "type": "string", "description": "Movie title, e.g. 'Wicked'" },
                        "date": { "type": "string", "description": "Date to look up, e.g. 'today', 'tomorrow', '15-11', '2025-11-15'" },
                        "city_name": { "type": "string", "description": "City name, if the user gave one" },
                        "cinema_name": { "type": "string", "description": "Specific cinema name, if the user gave one" }
                    },
                    "required": ["movie_title", "date"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "get_movies_at_cinema",
                "description": "List the MOVIES playing at a specific CINEMA on a specific DATE.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "cinema_name": { "type": "string", "description": "Cinema name" },
                        "date": { "type": "string", "description": "Date to look up, e.g. 'today', 'tomorrow'" }
                    },
                    "required": ["cinema_name", "date"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "get_movie_details",
                "description": "Get the details (plot, cast, director, genre) of a specific MOVIE.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "movie_title": { "type": "string", "description": "Movie title" }
                    },
                    "required": ["movie_title"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "get_movie_recommendations_based_on_history",
                "description": "Recommend up to 3 unseen movies based on the user's favorite genre from their booking history. Call only for open-ended asks like 'recommend me something'. Takes no parameters.",
                "parameters": { "type": "object", "properties": {}, "required": [] }
            }
        }
    ])
}

/* ---------- tool implementations ---------- */

#[derive(Debug, sqlx::FromRow, Serialize)]
struct ShowtimeHit {
    showtime_id: i32,
    start_time: DateTime<chrono::Utc>,
    ticket_price: i64,
    cinema_name: String,
    city: String,
    movie_id: i32,
    title: String,
    features: Option<Vec<String>>,
}

async fn get_showtimes_for_movie(pool: &PgPool, args: &Value, utc_offset_hours: i32) -> Value {
    let movie_title = args.get("movie_title").and_then(Value::as_str).unwrap_or("");
    let city_name = args.get("city_name").and_then(Value::as_str);
    let cinema_name = args.get("cinema_name").and_then(Value::as_str);
    let date = args.get("date").and_then(Value::as_str);

    if movie_title.is_empty() || date.is_none() {
        return json!({ "error": "Missing movie title or date." });
    }
    if city_name.is_none() && cinema_name.is_none() {
        return json!({
            "message": format!("Which city or cinema would you like to see '{movie_title}' in?")
        });
    }

    let query_date = dates::resolve_query_date(date, utc_offset_hours);

    let mut q = String::from(
        "SELECT s.showtime_id, s.start_time, s.ticket_price,
                c.name AS cinema_name, c.city, m.movie_id, m.title, m.features
         FROM showtimes s
         JOIN movies m ON s.movie_id = m.movie_id
         JOIN cinemas c ON s.cinema_id = c.cinema_id
         WHERE m.title ILIKE $1 AND s.start_time::date = $2 AND s.start_time > NOW()",
    );
    let mut bind_idx = 3;
    if city_name.is_some() {
        q.push_str(&format!(" AND c.city ILIKE ${bind_idx}"));
        bind_idx += 1;
    }
    if cinema_name.is_some() {
        q.push_str(&format!(" AND c.name ILIKE ${bind_idx}"));
    }
    q.push_str(" ORDER BY c.name, s.start_time");

    let mut dbq = sqlx::query_as::<_, ShowtimeHit>(&q)
        .bind(format!("%{movie_title}%"))
        .bind(query_date);
    if let Some(city) = city_name {
        dbq = dbq.bind(format!("%{city}%"));
    }
    if let Some(cinema) = cinema_name {
        dbq = dbq.bind(format!("%{cinema}%"));
    }

    match dbq.fetch_all(pool).await {
        Ok(rows) if rows.is_empty() => {
            let place = cinema_name.or(city_name).unwrap_or_default();
            json!({
                "message": format!(
                    "Sorry, I found no showtimes for '{movie_title}' at '{place}' on {query_date}."
                )
            })
        }
        Ok(rows) => serde_json::to_value(rows).unwrap_or_else(|_| json!([])),
        Err(e) => {
            error!("get_showtimes_for_movie query failed: {:?}", e);
            json!({ "error": "Database query failed." })
        }
    }
}

async fn get_movies_at_cinema(pool: &PgPool, args: &Value, utc_offset_hours: i32) -> Value {
    let cinema_name = args.get("cinema_name").and_then(Value::as_str).unwrap_or("");
    if cinema_name.is_empty() {
        return json!({ "error": "Missing cinema name." });
    }
    let query_date =
        dates::resolve_query_date(args.get("date").and_then(Value::as_str), utc_offset_hours);

    let rows = sqlx::query_as::<_, (String, Option<String>, i64)>(
        "SELECT m.title, m.genre, COUNT(s.showtime_id) AS showtime_count
         FROM showtimes s
         JOIN movies m ON s.movie_id = m.movie_id
         JOIN cinemas c ON s.cinema_id = c.cinema_id
         WHERE c.name ILIKE $1 AND s.start_time::date = $2 AND s.start_time > NOW()
         GROUP BY m.title, m.genre
         ORDER BY m.title",
    )
    .bind(format!("%{cinema_name}%"))
    .bind(query_date)
    .fetch_all(pool)
    .await;

    match rows {
        Ok(rows) if rows.is_empty() => json!({
            "message": format!("No movies are playing at '{cinema_name}' on {query_date}.")
        }),
        Ok(rows) => Value::Array(
            rows.into_iter()
                .map(|(title, genre, count)| {
                    json!({ "title": title, "genre": genre, "showtime_count": count })
                })
                .collect(),
        ),
        Err(e) => {
            error!("get_movies_at_cinema query failed: {:?}", e);
            json!({ "error": "Database query failed." })
        }
    }
}

#[derive(Debug, sqlx::FromRow, Serialize)]
struct MovieDetails {
    title: String,
    description: Option<String>,
    genre: Option<String>,
    rating: Option<f64>,
    director: Option<String>,
    cast_members: Option<String>,
    duration_minutes: Option<i32>,
}

async fn get_movie_details(pool: &PgPool, args: &Value) -> Value {
    let movie_title = args.get("movie_title").and_then(Value::as_str).unwrap_or("");
    if movie_title.is_empty() {
        return json!({ "error": "Missing movie title." });
    }

    let row = sqlx::query_as::<_, MovieDetails>(
        "SELECT title, description, genre, rating, director, cast_members, duration_minutes
         FROM movies
         WHERE title ILIKE $1
         LIMIT 1",
    )
    .bind(format!("%{movie_title}%"))
    .fetch_optional(pool)
    .await;

    match row {
        Ok(Some(details)) => serde_json::to_value(details).unwrap_or_else(|_| json!({})),
        Ok(None) => json!({ "message": format!("No information found for '{movie_title}'.") }),
        Err(e) => {
            error!("get_movie_details query failed: {:?}", e);
            json!({ "error": "Database query failed." })
        }
    }
}

#[derive(Debug, sqlx::FromRow, Serialize)]
struct RecommendedMovie {
    movie_id: i32,
    title: String,
    genre: Option<String>,
    poster_url: Option<String>,
    description: Option<String>,
}

async fn get_movie_recommendations(pool: &PgPool, user_id: i32) -> Value {
    // Favorite genres from watched bookings
    let genres = sqlx::query_as::<_, (String, i64)>(
        "SELECT m.genre, COUNT(b.booking_id) AS watch_count
         FROM bookings b
         JOIN showtimes s ON b.showtime_id = s.showtime_id
         JOIN movies m ON s.movie_id = m.movie_id
         WHERE b.user_id = $1 AND s.start_time < NOW() AND m.genre IS NOT NULL
         GROUP BY m.genre
         ORDER BY watch_count DESC
         LIMIT 5",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await;

    let genres = match genres {
        Ok(g) => g,
        Err(e) => {
            error!("recommendation genre query failed: {:?}", e);
            return json!({ "error": "Database query failed." });
        }
    };

    let Some((top_genre, _)) = genres.into_iter().next() else {
        return json!({ "message": "You have no viewing history yet. Try watching something first!" });
    };

    // Movies the user has already seen
    let seen: Vec<i32> = sqlx::query_scalar(
        "SELECT DISTINCT s.movie_id
         FROM bookings b
         JOIN showtimes s ON b.showtime_id = s.showtime_id
         WHERE b.user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .unwrap_or_default();

    // Unseen releases in the favorite genre, best rated first
    let recommendations = sqlx::query_as::<_, RecommendedMovie>(
        "SELECT movie_id, title, genre, poster_url, description
         FROM movies
         WHERE genre = $1
           AND release_date <= CURRENT_DATE
           AND movie_id != ALL($2)
         ORDER BY rating DESC NULLS LAST
         LIMIT 3",
    )
    .bind(&top_genre)
    .bind(&seen)
    .fetch_all(pool)
    .await;

    match recommendations {
        Ok(rows) if rows.is_empty() => json!({
            "message": format!(
                "I can see you like {top_genre}, but there are no new {top_genre} releases you haven't seen."
            )
        }),
        Ok(rows) => json!({
            "top_genre": top_genre,
            "recommendations": rows,
        }),
        Err(e) => {
            error!("recommendation query failed: {:?}", e);
            json!({ "error": "Database query failed." })
        }
    }
}

/* ---------- prompts ---------- */

fn normal_prompt(username: &str, movies: &str, cities: &str, cinemas: &str) -> String {
    format!(
        "You are \"CineBot\", a professional and friendly assistant for a cinema chain.\n\
         You are talking to {username}.\n\n\
         CURRENT DATA (for matching names only):\n\
         * Now showing: {movies}\n\
         * Cities: {cities}\n\
         * Cinemas: {cinemas}\n\n\
         YOUR RULES:\n\
         1. PREFER LOOKUPS: when the user asks about showtimes, movie details, or wants a\n\
         recommendation, call the matching tool instead of answering from memory.\n\
         2. REMEMBER CONTEXT: when the user adds one detail (for example a date), recall the\n\
         movie and cinema from earlier messages and merge everything into one tool call.\n\
         3. ASK WHEN MISSING: if the movie, or both the city and cinema, are missing, ask for\n\
         them in a friendly way. If the user just says they want to book, ask which movie,\n\
         cinema and date they have in mind; never ask for their name or phone number.\n\
         4. PRESENT RESULTS: summarize tool output conversationally, include the screening\n\
         formats (3D, IMAX) when present, number the showtimes in order, and finish a\n\
         showtime listing with the exact question: \"Which showtime would you like?\"\n\
         5. GOLDEN RULE: if a tool returns an empty result or a message saying nothing was\n\
         found, report exactly that. Never invent showtimes, cinemas, or prices."
    )
}

fn selection_prompt() -> String {
    "You are an information extraction bot. The chat history contains an assistant message \
     listing numbered showtimes, and a final user message picking one. Respond with JSON only:\n\
     - picked by position (\"the second one\"): {\"choice_index\": 2} (1-based)\n\
     - picked by time (\"the 13:45 one\"): {\"choice_time\": \"13:45\"} (HH:MM)\n\
     - declined (\"never mind\"): {\"choice_index\": -1}\n\
     Do not add any prose. JSON only."
        .to_string()
}

/* ---------- service ---------- */

// One entry of the client-side chat transcript. Replies that carried raw
// showtime rows hand them back through `data`, so a later selection turn can
// resolve against structured rows instead of re-parsing prose.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    pub sender: String,
    pub text: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct AssistantReply {
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl AssistantReply {
    fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            data: None,
        }
    }
}

#[derive(Clone)]
pub struct AssistantService {
    client: GroqClient,
    pool: PgPool,
    utc_offset_hours: i32,
}

impl AssistantService {
    pub fn new(config: &AssistantConfig, pool: PgPool) -> Self {
        Self {
            client: GroqClient::from_config(config),
            pool,
            utc_offset_hours: config.utc_offset_hours,
        }
    }

    pub async fn respond(
        &self,
        user: &AuthUser,
        message: &str,
        history: &[HistoryEntry],
    ) -> anyhow::Result<AssistantReply> {
        if is_selection_turn(history) {
            return self.resolve_selection(message, history).await;
        }

        // Name lists the model can match user phrasing against
        let movies: Vec<String> = sqlx::query_scalar(
            "SELECT title FROM movies WHERE release_date <= CURRENT_DATE ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await?;
        let cities: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT city FROM cinemas ORDER BY city")
                .fetch_all(&self.pool)
                .await?;
        let cinemas: Vec<String> =
            sqlx::query_scalar("SELECT name FROM cinemas ORDER BY city, name")
                .fetch_all(&self.pool)
                .await?;

        let mut messages = vec![ChatMessage::system(normal_prompt(
            &user.username,
            &movies.join(", "),
            &cities.join(", "),
            &cinemas.join("; "),
        ))];
        for entry in history {
            messages.push(match entry.sender.as_str() {
                "user" => ChatMessage::user(&entry.text),
                _ => ChatMessage::assistant(&entry.text),
            });
        }
        messages.push(ChatMessage::user(message));

        // Call 1: the model decides between chatting and calling tools
        let decision = self
            .client
            .chat(
                messages.clone(),
                Some(tool_definitions()),
                Some("auto".to_string()),
                None,
            )
            .await?;

        let Some(tool_calls) = decision.tool_calls.clone().filter(|c| !c.is_empty()) else {
            let reply = decision
                .content
                .unwrap_or_else(|| "Sorry, I can't answer that yet.".to_string());
            return Ok(AssistantReply::text(reply));
        };

        let results: Vec<(ChatMessage, Value)> = join_all(
            tool_calls
                .iter()
                .map(|call| self.run_tool(user.user_id, call)),
        )
        .await;

        // Short-circuit before call 2 when the lookup found nothing, so the
        // model cannot paper over an empty result with invented data.
        if let Some((_, first)) = results.first() {
            if let Some(msg) = first.get("message").and_then(Value::as_str) {
                return Ok(AssistantReply::text(msg));
            }
            if first.as_array().is_some_and(|a| a.is_empty()) {
                return Ok(AssistantReply::text(
                    "Sorry, I found no showtimes matching your request.",
                ));
            }
        }

        // Raw rows ride along with the reply; the client echoes them back in
        // history so a selection turn can resolve against them.
        let data = results
            .first()
            .and_then(|(_, v)| v.as_array().map(|_| v.clone()));

        messages.push(decision);
        messages.extend(results.into_iter().map(|(msg, _)| msg));

        // Call 2: summarize the tool output
        let summary = self.client.chat(messages, None, None, None).await?;
        if summary.tool_calls.as_ref().is_some_and(|c| !c.is_empty()) {
            anyhow::bail!("model attempted a second tool round");
        }

        let reply = summary
            .content
            .unwrap_or_else(|| "Sorry, I can't answer that yet.".to_string());
        Ok(AssistantReply { reply, data })
    }

    async fn run_tool(&self, user_id: i32, call: &ToolCall) -> (ChatMessage, Value) {
        let args: Value = serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
            warn!("malformed tool arguments for {}: {:?}", call.function.name, e);
            json!({})
        });

        let result = match call.function.name.as_str() {
            "get_showtimes_for_movie" => {
                get_showtimes_for_movie(&self.pool, &args, self.utc_offset_hours).await
            }
            "get_movies_at_cinema" => {
                get_movies_at_cinema(&self.pool, &args, self.utc_offset_hours).await
            }
            "get_movie_details" => get_movie_details(&self.pool, &args).await,
            "get_movie_recommendations_based_on_history" => {
                get_movie_recommendations(&self.pool, user_id).await
            }
            other => {
                warn!("model requested unknown tool: {other}");
                json!({ "error": "Unknown tool." })
            }
        };

        let message = ChatMessage::tool(
            call.id.clone(),
            call.function.name.clone(),
            result.to_string(),
        );
        (message, result)
    }

    async fn resolve_selection(
        &self,
        message: &str,
        history: &[HistoryEntry],
    ) -> anyhow::Result<AssistantReply> {
        let mut messages = vec![ChatMessage::system(selection_prompt())];
        for entry in history {
            messages.push(match entry.sender.as_str() {
                "user" => ChatMessage::user(&entry.text),
                _ => ChatMessage::assistant(&entry.text),
            });
        }
        messages.push(ChatMessage::user(message));

        let response = self
            .client
            .chat(messages, None, None, Some(json!({ "type": "json_object" })))
            .await?;

        let content = response.content.unwrap_or_default();
        let choice: ShowtimeChoice = serde_json::from_str(&content).unwrap_or_default();

        if choice.choice_index == Some(-1) {
            return Ok(AssistantReply::text(
                "Understood. Anything else I can help you with?",
            ));
        }

        let listed = last_listed_showtimes(history);
        let selected = listed
            .as_deref()
            .and_then(|rows| resolve_choice(&choice, rows, self.utc_offset_hours));

        match selected {
            Some(showtime) => Ok(AssistantReply {
                reply: "Got it, here is the showtime you selected.".to_string(),
                data: Some(json!([showtime])),
            }),
            None => Ok(AssistantReply::text(
                "Sorry, I could not match that choice. Please name the exact time, \
                 for example 'the 13:45 one'.",
            )),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ShowtimeChoice {
    choice_index: Option<i64>,
    choice_time: Option<String>,
}

// The turn is a selection when the assistant just listed showtimes and asked
// the closing question from its presentation rules.
fn is_selection_turn(history: &[HistoryEntry]) -> bool {
    history
        .last()
        .filter(|entry| entry.sender != "user")
        .is_some_and(|entry| {
            entry
                .text
                .to_lowercase()
                .contains("which showtime would you like")
        })
}

// Most recent structured showtime rows carried in the transcript.
fn last_listed_showtimes(history: &[HistoryEntry]) -> Option<Vec<Value>> {
    history.iter().rev().find_map(|entry| {
        entry
            .data
            .as_ref()
            .and_then(Value::as_array)
            .filter(|rows| !rows.is_empty())
            .cloned()
    })
}

fn resolve_choice(choice: &ShowtimeChoice, showtimes: &[Value], utc_offset_hours: i32) -> Option<Value> {
    if let Some(index) = choice.choice_index {
        if index >= 1 {
            return showtimes.get(index as usize - 1).cloned();
        }
        return None;
    }

    let target = choice.choice_time.as_deref()?;
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());

    showtimes
        .iter()
        .find(|st| {
            st.get("start_time")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&offset).format("%H:%M").to_string() == target)
                .unwrap_or(false)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing(showtimes: Value) -> Vec<HistoryEntry> {
        vec![
            HistoryEntry {
                sender: "user".to_string(),
                text: "wicked at the downtown cinema today".to_string(),
                data: None,
            },
            HistoryEntry {
                sender: "bot".to_string(),
                text: "1. 10:00 (IMAX) 2. 13:45. Which showtime would you like?".to_string(),
                data: Some(showtimes),
            },
        ]
    }

    fn two_showtimes() -> Value {
        json!([
            { "showtime_id": 7, "start_time": "2025-11-15T03:00:00Z", "ticket_price": 80000 },
            { "showtime_id": 8, "start_time": "2025-11-15T06:45:00Z", "ticket_price": 80000 }
        ])
    }

    #[test]
    fn selection_turn_detection() {
        let history = listing(two_showtimes());
        assert!(is_selection_turn(&history));

        // A user message last means no selection is pending
        let mut history = listing(two_showtimes());
        history.push(HistoryEntry {
            sender: "user".to_string(),
            text: "actually, what's on tomorrow?".to_string(),
            data: None,
        });
        assert!(!is_selection_turn(&history));
    }

    #[test]
    fn choice_by_index_is_one_based() {
        let rows = two_showtimes();
        let rows = rows.as_array().unwrap();
        let choice = ShowtimeChoice {
            choice_index: Some(2),
            choice_time: None,
        };
        let picked = resolve_choice(&choice, rows, 7).unwrap();
        assert_eq!(picked["showtime_id"], 8);
    }

    #[test]
    fn choice_by_local_time_matches_offset_clock() {
        let rows = two_showtimes();
        let rows = rows.as_array().unwrap();
        // 03:00 UTC is 10:00 at UTC+7
        let choice = ShowtimeChoice {
            choice_index: None,
            choice_time: Some("10:00".to_string()),
        };
        let picked = resolve_choice(&choice, rows, 7).unwrap();
        assert_eq!(picked["showtime_id"], 7);
    }

    #[test]
    fn unmatched_choice_resolves_to_none() {
        let rows = two_showtimes();
        let rows = rows.as_array().unwrap();
        let choice = ShowtimeChoice {
            choice_index: None,
            choice_time: Some("23:59".to_string()),
        };
        assert!(resolve_choice(&choice, rows, 7).is_none());

        let out_of_range = ShowtimeChoice {
            choice_index: Some(9),
            choice_time: None,
        };
        assert!(resolve_choice(&out_of_range, rows, 7).is_none());
    }

    fn test_client(base_url: String) -> GroqClient {
        GroqClient::from_config(&crate::config::AssistantConfig {
            api_key: "test-key".to_string(),
            base_url,
            model: "test-model".to_string(),
            utc_offset_hours: 7,
        })
    }

    #[tokio::test]
    async fn chat_parses_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {
                                "name": "get_movie_details",
                                "arguments": "{\"movie_title\":\"Wicked\"}"
                            }
                        }]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let message = test_client(server.uri())
            .chat(
                vec![ChatMessage::user("tell me about wicked")],
                Some(tool_definitions()),
                Some("auto".to_string()),
                None,
            )
            .await
            .unwrap();

        let calls = message.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "get_movie_details");
        assert!(calls[0].function.arguments.contains("Wicked"));
    }

    #[tokio::test]
    async fn chat_maps_rate_limits_to_a_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = test_client(server.uri())
            .chat(vec![ChatMessage::user("hi")], None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::RateLimited));
    }
}
