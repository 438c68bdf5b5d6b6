use chrono::DateTime;
use diesel::prelude::*;

use verifai_shared::{Notification, NotificationKind, SyncResult};

use crate::schema::notifications;

/// Cache row for a notification.
///
/// `kind` holds the bare tag so rows stay queryable by type; `kind_data`
/// holds the full type-specific payload; `created_at` is unix millis.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Insertable)]
#[diesel(table_name = notifications)]
pub struct NotificationRow {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub content: String,
    pub created_at: i64,
    pub is_read: bool,
    pub priority: i32,
    pub user_id: String,
    pub group_id: Option<String>,
    pub deep_link: Option<String>,
    pub metadata: Option<String>,
    pub kind_data: String,
}

impl NotificationRow {
    pub fn from_domain(notification: &Notification) -> SyncResult<Self> {
        let metadata = notification
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        Ok(Self {
            id: notification.id.clone(),
            kind: notification.kind.tag().to_string(),
            title: notification.title.clone(),
            content: notification.content.clone(),
            created_at: notification.created_at.timestamp_millis(),
            is_read: notification.is_read,
            priority: notification.priority,
            user_id: notification.user_id.clone(),
            group_id: notification.group_id.clone(),
            deep_link: notification.deep_link.clone(),
            metadata,
            kind_data: notification.kind.to_payload()?,
        })
    }

    pub fn into_domain(self) -> SyncResult<Notification> {
        let kind = NotificationKind::from_payload(&self.kind_data)?;
        let created_at = DateTime::from_timestamp_millis(self.created_at)
            .ok_or_else(|| anyhow::anyhow!("timestamp out of range: {}", self.created_at))?;
        let metadata = self
            .metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(Notification {
            id: self.id,
            kind,
            title: self.title,
            content: self.content,
            created_at,
            is_read: self.is_read,
            priority: self.priority,
            user_id: self.user_id,
            group_id: self.group_id,
            deep_link: self.deep_link,
            metadata,
        })
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use verifai_shared::NotificationKind;

    use super::*;

    #[test]
    fn row_mapping_preserves_the_domain_model() {
        let notification = Notification {
            id: "n-1".into(),
            kind: NotificationKind::Like {
                target_id: "answer-9".into(),
                target_type: "ANSWER".into(),
                user_id: "u-2".into(),
                user_name: "Mina".into(),
            },
            title: "Someone liked your answer".into(),
            content: "Mina liked your answer".into(),
            created_at: DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap(),
            is_read: false,
            priority: 1,
            user_id: "u-1".into(),
            group_id: Some("answers".into()),
            deep_link: Some("verifai://answers/answer-9".into()),
            metadata: Some(serde_json::json!({ "badge": true })),
        };

        let row = NotificationRow::from_domain(&notification).unwrap();
        assert_eq!(row.kind, "LIKE");
        assert_eq!(row.into_domain().unwrap(), notification);
    }
}
