use serde::Serialize;

use crate::models::notificationmodel::Notification;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListDto {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}
