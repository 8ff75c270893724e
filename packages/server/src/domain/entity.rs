//! Entity: Notification
//!
//! Producer が作成し、コアは一切変更せずにルーティングのみを行います。

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::{
    error::PublishError,
    value_object::{NotificationId, Timestamp, UserId},
};

/// 通知種別
///
/// ペイロードの意味は Producer 側が所有し、コアはこのタグのみを扱います。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    FriendRequestReceived,
    FriendRequestAccepted,
    FriendRequestDeclined,
    FriendMessageReceived,
    EventCreated,
    EventUpdated,
    EventDeleted,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 7] = [
        NotificationKind::FriendRequestReceived,
        NotificationKind::FriendRequestAccepted,
        NotificationKind::FriendRequestDeclined,
        NotificationKind::FriendMessageReceived,
        NotificationKind::EventCreated,
        NotificationKind::EventUpdated,
        NotificationKind::EventDeleted,
    ];

    /// ワイヤ上のタグ
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::FriendRequestReceived => "friend_request_received",
            NotificationKind::FriendRequestAccepted => "friend_request_accepted",
            NotificationKind::FriendRequestDeclined => "friend_request_declined",
            NotificationKind::FriendMessageReceived => "friend_message_received",
            NotificationKind::EventCreated => "event_created",
            NotificationKind::EventUpdated => "event_updated",
            NotificationKind::EventDeleted => "event_deleted",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PublishError::UnknownKind(s.to_string()))
    }
}

/// 通知
///
/// 一度生成されたら不変。フィールドは private で、読み取り専用アクセサのみ公開します。
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    id: NotificationId,
    target_user_id: Option<UserId>,
    kind: NotificationKind,
    payload: serde_json::Value,
    created_at: Timestamp,
}

impl Notification {
    /// 特定ユーザー宛の通知を作成
    pub fn to_user(target: UserId, kind: NotificationKind, payload: serde_json::Value) -> Self {
        Self::from_parts(
            NotificationId::generate(),
            Some(target),
            kind,
            payload,
            Timestamp::now(),
        )
    }

    /// 全接続へのブロードキャスト通知を作成
    pub fn broadcast(kind: NotificationKind, payload: serde_json::Value) -> Self {
        Self::from_parts(
            NotificationId::generate(),
            None,
            kind,
            payload,
            Timestamp::now(),
        )
    }

    /// 全フィールドを指定して復元（pub/sub から受信した通知用）
    pub fn from_parts(
        id: NotificationId,
        target_user_id: Option<UserId>,
        kind: NotificationKind,
        payload: serde_json::Value,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            target_user_id,
            kind,
            payload,
            created_at,
        }
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn target_user_id(&self) -> Option<&UserId> {
        self.target_user_id.as_ref()
    }

    pub fn is_broadcast(&self) -> bool {
        self.target_user_id.is_none()
    }

    pub fn kind(&self) -> NotificationKind {
        self.kind
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_from_str_accepts_known_tags() {
        // テスト項目: 既知のタグはすべてパースできる
        // given (前提条件):
        let tags: Vec<&str> = NotificationKind::ALL.iter().map(|k| k.as_str()).collect();

        // when (操作):
        let parsed: Vec<NotificationKind> = tags.iter().map(|t| t.parse().unwrap()).collect();

        // then (期待する結果):
        assert_eq!(parsed, NotificationKind::ALL.to_vec());
    }

    #[test]
    fn test_kind_from_str_rejects_unknown_tag() {
        // テスト項目: 未知のタグは UnknownKind エラーになる
        // given (前提条件):

        // when (操作):
        let result = "ticket_refunded".parse::<NotificationKind>();

        // then (期待する結果):
        assert_eq!(
            result,
            Err(PublishError::UnknownKind("ticket_refunded".to_string()))
        );
    }

    #[test]
    fn test_kind_serde_matches_as_str() {
        // テスト項目: serde のタグと as_str が一致する
        // given (前提条件):
        let kind = NotificationKind::FriendRequestAccepted;

        // when (操作):
        let serialized = serde_json::to_string(&kind).unwrap();

        // then (期待する結果):
        assert_eq!(serialized, format!("\"{}\"", kind.as_str()));
    }

    #[test]
    fn test_to_user_sets_target() {
        // テスト項目: ユーザー宛の通知は宛先を持ち、ブロードキャストではない
        // given (前提条件):
        let target = UserId::new("U1".to_string()).unwrap();

        // when (操作):
        let notification = Notification::to_user(
            target.clone(),
            NotificationKind::FriendRequestReceived,
            json!({"from": "U2"}),
        );

        // then (期待する結果):
        assert_eq!(notification.target_user_id(), Some(&target));
        assert!(!notification.is_broadcast());
        assert_eq!(notification.payload()["from"], "U2");
        assert!(notification.created_at().value() > 0);
    }

    #[test]
    fn test_broadcast_has_no_target() {
        // テスト項目: ブロードキャスト通知は宛先を持たない
        // given (前提条件):

        // when (操作):
        let notification = Notification::broadcast(NotificationKind::EventUpdated, json!({}));

        // then (期待する結果):
        assert!(notification.is_broadcast());
        assert!(notification.target_user_id().is_none());
    }

    #[test]
    fn test_each_notification_gets_a_new_id() {
        // テスト項目: 通知ごとに異なる ID が割り当てられる
        // given (前提条件):

        // when (操作):
        let a = Notification::broadcast(NotificationKind::EventCreated, json!(null));
        let b = Notification::broadcast(NotificationKind::EventCreated, json!(null));

        // then (期待する結果):
        assert_ne!(a.id(), b.id());
    }
}
