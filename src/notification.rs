use serde::{Deserialize, Deserializer, Serialize};

use crate::config::CallbackConfig;

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
#[allow(dead_code)]
pub(crate) struct PushData {
    #[serde(deserialize_with = "null_as_default")]
    pub pushed_at: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tag: String,
    #[serde(deserialize_with = "null_as_default")]
    pub pusher: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
#[allow(dead_code)]
pub(crate) struct Repository {
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_trusted: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub full_description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub repo_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub owner: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_official: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub is_private: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub namespace: String,
    #[serde(deserialize_with = "null_as_default")]
    pub star_count: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub comment_count: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub date_created: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub repo_name: String,
}

/// Body of a Docker Hub push webhook.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Notification {
    #[serde(deserialize_with = "null_as_default")]
    pub push_data: PushData,
    #[serde(deserialize_with = "null_as_default")]
    pub callback_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub repository: Repository,
}

impl Notification {
    pub fn is_trusted(&self, prefix: &str) -> bool {
        self.callback_url.starts_with(prefix)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(dead_code)]
pub(crate) enum CallbackState {
    Success,
    Failure,
    Error,
}

/// Reply posted to the callback URL of a notification.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct Acknowledgement {
    pub state: CallbackState,
    pub description: String,
    pub context: String,
    pub target_url: String,
}

impl Acknowledgement {
    pub fn success(config: &CallbackConfig) -> Self {
        Self {
            state: CallbackState::Success,
            description: config.description.clone(),
            context: config.context.clone(),
            target_url: config.target_url.clone(),
        }
    }
}
