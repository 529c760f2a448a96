//! In-memory notification inbox with webhook fan-out.
//!
//! Each user has a bounded inbox; the oldest notifications fall off once
//! `max_per_user` is reached, and once `max_users` inboxes exist the one with
//! the oldest latest notification is dropped for a new recipient. Webhook delivery is fire-and-forget: errors are
//! logged but never propagate to the caller.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use fv_core::config::{NotificationLevel, NotificationsConfig, WebhookConfig};
use fv_core::{NotificationId, UserId};
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// HTTP timeout for webhook requests.
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// A notification to deliver to one or more users.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    #[schema(value_type = String)]
    pub level: NotificationLevel,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub user_ids: Vec<UserId>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// A delivered notification as stored in a user's inbox.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Notification {
    #[schema(value_type = String)]
    pub id: NotificationId,
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub date: DateTime<Utc>,
    pub is_read: bool,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    #[schema(value_type = String)]
    pub level: NotificationLevel,
}

/// A page of a user's notifications.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationResult {
    pub notifications: Vec<Notification>,
    pub total_record_count: usize,
}

/// Unread totals for one user.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationsSummary {
    pub unread_count: usize,
    #[schema(value_type = Option<String>)]
    pub max_unread_notification_level: Option<NotificationLevel>,
}

/// Notification type catalogue entry.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationTypeInfo {
    #[serde(rename = "Type")]
    pub kind: String,
    pub name: String,
    pub enabled: bool,
    pub category: String,
    pub is_based_on_user_event: bool,
}

/// A delivery service, as listed by `GET /Notifications/Services`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct NameIdPair {
    pub name: String,
    pub id: String,
}

/// Filter and paging for [`NotificationManager::list`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationQuery {
    pub is_read: Option<bool>,
    pub start_index: usize,
    pub limit: Option<usize>,
}

const TYPES: &[(&str, &str, &str, bool)] = &[
    ("ApplicationUpdateInstalled", "Application update installed", "Application", false),
    ("AttachmentExtractionFailed", "Attachment extraction failed", "Media", false),
    ("LibraryCatalogReloaded", "Library catalogue reloaded", "Library", false),
    ("ServerRestartRequired", "Server restart required", "System", false),
    ("TaskFailed", "Scheduled task failed", "System", false),
    ("UserLockedOut", "User locked out", "Users", true),
];

/// Per-user notification inboxes and webhook delivery.
pub struct NotificationManager {
    inboxes: RwLock<HashMap<UserId, VecDeque<Notification>>>,
    max_per_user: usize,
    max_users: usize,
    admin_users: Vec<UserId>,
    webhooks: Vec<WebhookConfig>,
    client: Client,
}

impl NotificationManager {
    pub fn new(config: &NotificationsConfig) -> Self {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build webhook HTTP client: {e}");
                Client::new()
            });

        Self {
            inboxes: RwLock::new(HashMap::new()),
            max_per_user: config.max_per_user.max(1),
            max_users: config.max_users.max(1),
            admin_users: config.admin_users.clone(),
            webhooks: config.webhooks.clone(),
            client,
        }
    }

    /// Deliver `request` to every listed user. Returns the created ids.
    pub fn send(&self, request: NotificationRequest) -> Vec<NotificationId> {
        let date = request.date.unwrap_or_else(Utc::now);
        let mut ids = Vec::with_capacity(request.user_ids.len());

        {
            let mut inboxes = self.inboxes.write();
            for user_id in &request.user_ids {
                let notification = Notification {
                    id: NotificationId::new(),
                    user_id: *user_id,
                    date,
                    is_read: false,
                    name: request.name.clone(),
                    description: request.description.clone(),
                    url: request.url.clone(),
                    level: request.level,
                };
                ids.push(notification.id);

                if !inboxes.contains_key(user_id) && inboxes.len() >= self.max_users {
                    evict_stalest(&mut inboxes, &request.user_ids);
                }
                let inbox = inboxes.entry(*user_id).or_default();
                inbox.push_front(notification);
                inbox.truncate(self.max_per_user);
            }
        }

        tracing::info!(
            name = %request.name,
            level = ?request.level,
            recipients = ids.len(),
            "Notification sent"
        );

        self.fan_out(&request, date);
        ids
    }

    /// Deliver `request` to the configured admin users.
    pub fn send_to_admins(&self, mut request: NotificationRequest) -> Vec<NotificationId> {
        request.user_ids = self.admin_users.clone();
        if request.user_ids.is_empty() {
            tracing::debug!(name = %request.name, "No admin users configured for notification");
        }
        self.send(request)
    }

    /// Newest-first notifications of `user_id`, filtered and paged.
    pub fn list(&self, user_id: UserId, query: NotificationQuery) -> NotificationResult {
        let inboxes = self.inboxes.read();
        let matching: Vec<&Notification> = inboxes
            .get(&user_id)
            .map(|inbox| {
                inbox
                    .iter()
                    .filter(|n| query.is_read.map_or(true, |r| n.is_read == r))
                    .collect()
            })
            .unwrap_or_default();

        let total_record_count = matching.len();
        let notifications = matching
            .into_iter()
            .skip(query.start_index)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        NotificationResult {
            notifications,
            total_record_count,
        }
    }

    pub fn summary(&self, user_id: UserId) -> NotificationsSummary {
        let inboxes = self.inboxes.read();
        let unread = inboxes
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter(|n| !n.is_read);

        let mut unread_count = 0;
        let mut max_level = None;
        for n in unread {
            unread_count += 1;
            max_level = max_level.max(Some(n.level));
        }

        NotificationsSummary {
            unread_count,
            max_unread_notification_level: max_level,
        }
    }

    /// Set the read flag on `ids`, or on every notification when `ids` is
    /// empty. Returns the number of notifications changed.
    pub fn mark(&self, user_id: UserId, ids: &[NotificationId], is_read: bool) -> usize {
        let mut inboxes = self.inboxes.write();
        let Some(inbox) = inboxes.get_mut(&user_id) else {
            return 0;
        };

        let mut changed = 0;
        for n in inbox
            .iter_mut()
            .filter(|n| ids.is_empty() || ids.contains(&n.id))
        {
            if n.is_read != is_read {
                n.is_read = is_read;
                changed += 1;
            }
        }
        changed
    }

    /// Static notification type catalogue.
    pub fn types(&self) -> Vec<NotificationTypeInfo> {
        TYPES
            .iter()
            .map(|&(kind, name, category, user_event)| NotificationTypeInfo {
                kind: kind.to_string(),
                name: name.to_string(),
                enabled: true,
                category: category.to_string(),
                is_based_on_user_event: user_event,
            })
            .collect()
    }

    /// Enabled webhook services.
    pub fn services(&self) -> Vec<NameIdPair> {
        self.webhooks
            .iter()
            .filter(|w| w.enabled)
            .map(|w| NameIdPair {
                name: w.name.clone(),
                id: w.name.to_lowercase(),
            })
            .collect()
    }

    fn fan_out(&self, request: &NotificationRequest, date: DateTime<Utc>) {
        let targets: Vec<&WebhookConfig> = self
            .webhooks
            .iter()
            .filter(|w| w.enabled && !w.url.is_empty() && request.level >= w.min_level)
            .collect();
        if targets.is_empty() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No async runtime, skipping webhook delivery");
            return;
        };

        let payload = serde_json::json!({
            "name": request.name,
            "description": request.description,
            "url": request.url,
            "level": request.level,
            "date": date,
        });

        for webhook in targets {
            let client = self.client.clone();
            let name = webhook.name.clone();
            let url = webhook.url.clone();
            let payload = payload.clone();
            runtime.spawn(async move {
                deliver(&client, &name, &url, &payload).await;
            });
        }
    }
}

/// Drop the inbox whose newest notification is oldest, sparing `keep`.
fn evict_stalest(inboxes: &mut HashMap<UserId, VecDeque<Notification>>, keep: &[UserId]) {
    let stalest = inboxes
        .iter()
        .filter(|(user, _)| !keep.contains(user))
        .min_by_key(|(_, inbox)| inbox.front().map(|n| n.date))
        .map(|(user, _)| *user);
    if let Some(user) = stalest {
        inboxes.remove(&user);
        tracing::debug!(user = %user, "Evicted notification inbox");
    }
}

async fn deliver(client: &Client, name: &str, url: &str, payload: &serde_json::Value) {
    match client.post(url).json(payload).send().await {
        Ok(resp) if resp.status().is_success() => {
            tracing::debug!(webhook = %name, "Webhook delivered");
        }
        Ok(resp) => {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(
                webhook = %name,
                status = %status,
                body = %body,
                "Webhook returned non-success status"
            );
        }
        Err(e) => {
            tracing::warn!(webhook = %name, error = %e, "Failed to deliver webhook");
        }
    }
}
