use std::{collections::BTreeMap, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    domain::{ChatId, MessageRef},
    formatting::history_text,
    game::{
        DrawConfig, DrawOutcome, Game, GameError, GenerationPolicy, HistorySnapshot, Number,
        Position,
    },
    messaging::port::MessagingPort,
    Result,
};

/// The chat message that shows the running history.
#[derive(Debug, Default)]
struct HistoryBoard {
    epoch: u64,
    chat_id: Option<ChatId>,
    message: Option<MessageRef>,
    /// Ledger length of the last snapshot rendered on the board.
    published: Option<usize>,
}

impl HistoryBoard {
    fn is_stale(&self, snapshot: &HistorySnapshot) -> bool {
        if snapshot.epoch != self.epoch {
            return true;
        }
        matches!(self.published, Some(len) if snapshot.len() <= len)
    }
}

/// Single-writer access to the game plus the history board.
///
/// Each game operation takes the game lock once, so check-then-update runs as
/// one step. Board I/O happens under a separate lock and never holds the game.
pub struct GameService {
    game: Mutex<Game>,
    board: Mutex<HistoryBoard>,
    messenger: Arc<dyn MessagingPort>,
    default_policy: GenerationPolicy,
    display_limit: usize,
}

impl GameService {
    pub fn new(
        game: Game,
        messenger: Arc<dyn MessagingPort>,
        default_policy: GenerationPolicy,
        display_limit: usize,
    ) -> Self {
        Self {
            game: Mutex::new(game),
            board: Mutex::new(HistoryBoard::default()),
            messenger,
            default_policy,
            display_limit,
        }
    }

    pub fn default_policy(&self) -> GenerationPolicy {
        self.default_policy
    }

    /// Replace the configuration and point the board at `chat_id`.
    ///
    /// The board starts empty; the next [`GameService::publish_history`] posts
    /// a fresh display message.
    pub async fn reconfigure(
        &self,
        chat_id: ChatId,
        row_width: usize,
        low: Number,
        high: Number,
        policy: Option<GenerationPolicy>,
    ) -> Result<DrawConfig> {
        let (config, epoch) = {
            let mut game = self.game.lock().await;
            let config = game.reconfigure(
                row_width,
                low,
                high,
                policy.unwrap_or(self.default_policy),
            )?;
            (config, game.epoch())
        };

        self.reset_board(chat_id, epoch).await;
        tracing::info!(
            chat_id = chat_id.0,
            row_width = config.row_width,
            low = config.low,
            high = config.high,
            policy = %config.policy,
            "game reconfigured"
        );
        Ok(config)
    }

    /// Point the board at `chat_id` for `epoch`. A reset for an older epoch
    /// than the board already tracks is ignored.
    async fn reset_board(&self, chat_id: ChatId, epoch: u64) {
        let mut board = self.board.lock().await;
        if epoch <= board.epoch {
            return;
        }
        *board = HistoryBoard {
            epoch,
            chat_id: Some(chat_id),
            message: None,
            published: None,
        };
    }

    pub async fn draw(&self, row_count: usize) -> Result<DrawOutcome> {
        let out = self.game.lock().await.draw_batch(row_count)?;
        tracing::info!(
            rows = out.row_count(),
            ledger_len = out.history.len(),
            "numbers drawn"
        );
        Ok(out)
    }

    pub async fn set_forced(&self, values: &[Number]) -> Result<()> {
        self.game.lock().await.set_forced(values)?;
        Ok(())
    }

    pub async fn set_forbidden(&self, values: &[Number]) -> Result<usize> {
        Ok(self.game.lock().await.set_forbidden(values)?)
    }

    pub async fn search(&self, target: Number) -> Result<Vec<Position>> {
        Ok(self.game.lock().await.search(target)?)
    }

    pub async fn frequency_report(&self) -> Result<BTreeMap<Number, usize>> {
        Ok(self.game.lock().await.frequency_report()?)
    }

    pub async fn render_history(&self) -> Vec<Vec<Number>> {
        self.game.lock().await.render_history()
    }

    pub async fn config(&self) -> Option<DrawConfig> {
        self.game.lock().await.config().copied()
    }

    /// Render the current ledger on the board.
    pub async fn refresh_history(&self) -> Result<Option<MessageRef>> {
        let snapshot = self
            .game
            .lock()
            .await
            .history_snapshot()
            .ok_or(GameError::NotConfigured)?;
        self.publish_history(&snapshot).await
    }

    /// Show `snapshot` on the board.
    ///
    /// Edits the recorded display message; if that edit fails (or nothing is
    /// recorded yet) a new message is sent and becomes the board. Snapshots
    /// older than what is already shown are skipped and yield `Ok(None)`.
    pub async fn publish_history(&self, snapshot: &HistorySnapshot) -> Result<Option<MessageRef>> {
        let mut board = self.board.lock().await;
        let Some(chat_id) = board.chat_id else {
            return Ok(None);
        };
        if board.is_stale(snapshot) {
            tracing::debug!(
                epoch = snapshot.epoch,
                len = snapshot.len(),
                "skipping stale history snapshot"
            );
            return Ok(None);
        }

        let text = history_text(&snapshot.rows(), self.display_limit);

        if let Some(msg) = board.message {
            match self.messenger.edit_html(msg, &text).await {
                Ok(()) => {
                    board.published = Some(snapshot.len());
                    return Ok(Some(msg));
                }
                Err(e) => {
                    tracing::warn!(
                        message_id = msg.message_id.0,
                        "history edit failed, posting a new board: {e}"
                    );
                }
            }
        }

        let msg = self.messenger.send_html(chat_id, &text).await?;
        board.message = Some(msg);
        board.published = Some(snapshot.len());
        Ok(Some(msg))
    }

    pub async fn board_message(&self) -> Option<MessageRef> {
        self.board.lock().await.message
    }
}
