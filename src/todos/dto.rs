use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::Todo;

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl CreateTodoRequest {
    /// Trimmed title, if one was actually supplied.
    pub fn clean_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Trimmed description; empty collapses to none and lands as NULL.
    pub fn clean_description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// PATCH body. `done` stays a raw JSON value so anything but a real boolean
/// is reported as such instead of being coerced.
#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub id: Option<Uuid>,
    pub done: Option<serde_json::Value>,
}

impl UpdateTodoRequest {
    pub fn done_flag(&self) -> Option<bool> {
        self.done.as_ref().and_then(serde_json::Value::as_bool)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub done: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        Self {
            id: todo.id,
            title: todo.title,
            description: todo.description,
            done: todo.done,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn todo_response_uses_camel_case_and_keeps_null_description() {
        let now = OffsetDateTime::now_utc();
        let response = TodoResponse::from(Todo {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Buy milk".into(),
            description: None,
            done: false,
            created_at: now,
            updated_at: now,
        });

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"updatedAt\""));
        assert!(json.contains("\"description\":null"));
        assert!(!json.contains("user_id"));
        assert!(!json.contains("userId"));
    }

    #[test]
    fn create_request_trims_title_and_description() {
        let request: CreateTodoRequest =
            serde_json::from_str(r#"{"title":"  Buy milk  ","description":"   "}"#).unwrap();
        assert_eq!(request.clean_title(), Some("Buy milk"));
        assert_eq!(request.clean_description(), None);

        let blank: CreateTodoRequest = serde_json::from_str(r#"{"title":"   "}"#).unwrap();
        assert_eq!(blank.clean_title(), None);
    }

    #[test]
    fn update_request_accepts_only_real_booleans() {
        let real: UpdateTodoRequest =
            serde_json::from_str(&format!(r#"{{"id":"{}","done":true}}"#, Uuid::new_v4())).unwrap();
        assert_eq!(real.done_flag(), Some(true));

        let stringly: UpdateTodoRequest =
            serde_json::from_str(&format!(r#"{{"id":"{}","done":"true"}}"#, Uuid::new_v4()))
                .unwrap();
        assert_eq!(stringly.done_flag(), None);

        let numeric: UpdateTodoRequest =
            serde_json::from_str(&format!(r#"{{"id":"{}","done":1}}"#, Uuid::new_v4())).unwrap();
        assert_eq!(numeric.done_flag(), None);

        let absent: UpdateTodoRequest =
            serde_json::from_str(&format!(r#"{{"id":"{}"}}"#, Uuid::new_v4())).unwrap();
        assert_eq!(absent.done_flag(), None);
    }

    #[test]
    fn update_request_rejects_a_malformed_id() {
        let result = serde_json::from_str::<UpdateTodoRequest>(r#"{"id":"nope","done":true}"#);
        assert!(result.is_err());
    }
}
