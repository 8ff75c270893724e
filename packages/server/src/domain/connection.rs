//! Connection: 1 つのクライアントへの生きた双方向チャンネル
//!
//! ## 状態遷移
//!
//! ```text
//! Open ──request_close()──▶ Closing ──(flush)──▶ Closed
//!   └────────── transport error / EOF ─────────────▲
//! ```
//!
//! `Closed` への遷移は ConnectionRegistry からの削除と同時にのみ行われます
//! （`mark_closed` は crate 内部からしか呼べない）。

use std::{
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tokio_util::sync::CancellationToken;

use super::{
    error::DeliveryError,
    value_object::{SessionId, Timestamp, UserId},
};

/// 送信待ちメッセージの受信側（UI 層の writer タスクが保持する）
pub type OutboundReceiver = mpsc::Receiver<Arc<String>>;

/// 接続状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Open,
            1 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Open => 0,
            ConnectionState::Closing => 1,
            ConnectionState::Closed => 2,
        }
    }
}

/// クライアント接続
pub struct Connection {
    user_id: UserId,
    session_id: SessionId,
    /// リモートピアへの配信経路（容量有限）
    outbound: mpsc::Sender<Arc<String>>,
    state: AtomicU8,
    /// writer タスクに close を伝えるシグナル
    close_signal: CancellationToken,
    connected_at: Timestamp,
    delivered: AtomicU64,
}

impl Connection {
    /// ハンドシェイク完了時に新しい接続を作成する
    ///
    /// 新しい SessionId が割り当てられ、状態は `Open` から始まる。
    pub fn open(user_id: UserId, outbound_capacity: usize) -> (Arc<Self>, OutboundReceiver) {
        Self::open_at(user_id, outbound_capacity, Timestamp::now())
    }

    /// 接続時刻を指定して接続を作成する
    pub fn open_at(
        user_id: UserId,
        outbound_capacity: usize,
        connected_at: Timestamp,
    ) -> (Arc<Self>, OutboundReceiver) {
        let (tx, rx) = mpsc::channel(outbound_capacity.max(1));
        let connection = Self {
            user_id,
            session_id: SessionId::generate(),
            outbound: tx,
            state: AtomicU8::new(ConnectionState::Open.as_u8()),
            close_signal: CancellationToken::new(),
            connected_at,
            delivered: AtomicU64::new(0),
        };
        (Arc::new(connection), rx)
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn connected_at(&self) -> Timestamp {
        self.connected_at
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// 配信に成功したメッセージ数
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// close シグナル（writer タスクが監視する）
    pub fn close_signal(&self) -> CancellationToken {
        self.close_signal.clone()
    }

    /// 明示的な close を要求する（ログアウト、サーバー停止）
    ///
    /// `Open → Closing` に遷移した場合のみ `true` を返す。
    pub fn request_close(&self) -> bool {
        let transitioned = self
            .state
            .compare_exchange(
                ConnectionState::Open.as_u8(),
                ConnectionState::Closing.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if transitioned {
            self.close_signal.cancel();
        }
        transitioned
    }

    /// `Closed` に遷移する（終端）。ConnectionRegistry の削除処理からのみ呼ばれる。
    pub(crate) fn mark_closed(&self) {
        self.state
            .store(ConnectionState::Closed.as_u8(), Ordering::Release);
        self.close_signal.cancel();
    }

    /// メッセージを送信キューに積む
    ///
    /// バッファに空きがあれば即座に、満杯なら最大 `budget` だけ待つ。
    /// それでも送れなければ失敗とし、呼び出し側（Hub）が接続を切断扱いにする。
    pub async fn deliver(&self, message: Arc<String>, budget: Duration) -> Result<(), DeliveryError> {
        if !self.is_open() {
            return Err(DeliveryError::NotOpen);
        }

        let result = match self.outbound.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(DeliveryError::Closed),
            Err(TrySendError::Full(message)) => {
                match self.outbound.send_timeout(message, budget).await {
                    Ok(()) => Ok(()),
                    Err(SendTimeoutError::Timeout(_)) => Err(DeliveryError::Full),
                    Err(SendTimeoutError::Closed(_)) => Err(DeliveryError::Closed),
                }
            }
        };

        if result.is_ok() {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("user_id", &self.user_id)
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .finish()
    }
}
