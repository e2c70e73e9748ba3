use std::sync::Arc;

use teloxide::prelude::*;

use gbingo_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    formatting::{draw_text, escape_html, frequency_text, search_text, split_text_chunks},
    game::{GameError, GenerationPolicy, Number, MAX_DRAW_ROWS, MAX_FORCED},
    security::{Access, Decision},
    utils::AuditEvent,
};

use crate::router::AppState;

const CHAT_NOT_ALLOWED: &str =
    "⛔ This chat is not allowed to use the bot. Contact the bot owner for access.";
const DM_UNAVAILABLE: &str =
    "⚠️ I could not message you privately. Open a private chat with the bot and press Start.";

const CONFIGURE_USAGE: &str =
    "⚠️ Format: /gbingo N min max [distinct|exclusion]\nExample: /gbingo 5 1 100";
const DRAW_USAGE: &str = "⚠️ Format: /gnum X (1 to 5)";
const SEARCH_USAGE: &str = "⚠️ Format: /gsrch X\nExample: /gsrch 42";
const FORCE_USAGE: &str = "⚠️ Format: /gforce a b c (1 to 5 numbers)";
const EXCLUDE_USAGE: &str = "⚠️ Format: /gexclude a b c";

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum GameCommand {
    Start,
    Configure {
        row_width: usize,
        low: Number,
        high: Number,
        policy: Option<GenerationPolicy>,
    },
    Draw {
        rows: usize,
    },
    Search {
        target: Number,
    },
    Force {
        values: Vec<Number>,
    },
    Exclude {
        values: Vec<Number>,
    },
    Stats,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum UsageError {
    Format(&'static str),
    NotANumber,
    UnknownPolicy(String),
}

impl UsageError {
    fn text(&self) -> String {
        match self {
            UsageError::Format(usage) => usage.to_string(),
            UsageError::NotANumber => "⚠️ Numbers expected!".to_string(),
            UsageError::UnknownPolicy(p) => format!(
                "⚠️ Unknown mode <code>{}</code>. Use distinct or exclusion.",
                escape_html(p)
            ),
        }
    }
}

/// Where replies to a command go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Audience {
    Chat,
    /// Private chat with the sender; the command message is removed from the group.
    Private,
}

/// Access level by command name; `None` means the command is not ours.
fn access_for(cmd: &str) -> Option<Access> {
    match cmd {
        "gsrch" => Some(Access::Public),
        "gstart" | "gbingo" | "gnum" | "gforce" | "gexclude" => Some(Access::Operator),
        "gstats" => Some(Access::Superuser),
        _ => None,
    }
}

fn audience_for(cmd: &str) -> Audience {
    match cmd {
        "gforce" | "gexclude" | "gstats" => Audience::Private,
        _ => Audience::Chat,
    }
}

impl GameCommand {
    fn parse(cmd: &str, args: &str) -> Result<Self, UsageError> {
        let parts: Vec<&str> = args.split_whitespace().collect();
        match cmd {
            "gstart" => Ok(GameCommand::Start),
            "gbingo" => parse_configure(&parts),
            "gnum" => match parts.as_slice() {
                [rows] => Ok(GameCommand::Draw {
                    rows: parse_num(rows)?,
                }),
                _ => Err(UsageError::Format(DRAW_USAGE)),
            },
            "gsrch" => match parts.as_slice() {
                [target] => Ok(GameCommand::Search {
                    target: parse_num(target)?,
                }),
                _ => Err(UsageError::Format(SEARCH_USAGE)),
            },
            "gforce" => {
                let values = parse_number_list(args)?;
                if values.is_empty() {
                    return Err(UsageError::Format(FORCE_USAGE));
                }
                Ok(GameCommand::Force { values })
            }
            "gexclude" => Ok(GameCommand::Exclude {
                values: parse_number_list(args)?,
            }),
            "gstats" => Ok(GameCommand::Stats),
            _ => Err(UsageError::Format("")),
        }
    }
}

fn parse_configure(parts: &[&str]) -> Result<GameCommand, UsageError> {
    let (nums, policy) = match parts {
        [n, lo, hi] => ([*n, *lo, *hi], None),
        [n, lo, hi, p] => ([*n, *lo, *hi], Some(*p)),
        _ => return Err(UsageError::Format(CONFIGURE_USAGE)),
    };

    let row_width = parse_num(nums[0])?;
    let low = parse_num(nums[1])?;
    let high = parse_num(nums[2])?;
    let policy = policy
        .map(|p| {
            p.parse::<GenerationPolicy>()
                .map_err(|_| UsageError::UnknownPolicy(p.to_string()))
        })
        .transpose()?;

    Ok(GameCommand::Configure {
        row_width,
        low,
        high,
        policy,
    })
}

fn parse_num<T: std::str::FromStr>(s: &str) -> Result<T, UsageError> {
    s.trim().parse::<T>().map_err(|_| UsageError::NotANumber)
}

/// Numbers separated by whitespace and/or commas.
fn parse_number_list(args: &str) -> Result<Vec<Number>, UsageError> {
    args.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(parse_num)
        .collect()
}

fn game_error_text(e: &GameError) -> String {
    match e {
        GameError::NotConfigured => "⚠️ Set the parameters first: /gbingo N min max".to_string(),
        GameError::InvalidConfiguration(reason) => {
            format!("⚠️ Invalid parameters: {}", escape_html(reason))
        }
        GameError::InvalidRowCount(_) => format!("⚠️ X must be between 1 and {MAX_DRAW_ROWS}"),
        GameError::InvalidForcedCount(n) => {
            format!("⚠️ Give between 1 and {MAX_FORCED} numbers to force (got {n})")
        }
        GameError::ForcedOutOfRange(n) => format!("⚠️ {n} is outside the configured range"),
        GameError::EmptyForbiddenList => EXCLUDE_USAGE.to_string(),
        GameError::EmptyLedger => "⚠️ History is empty, no numbers drawn yet.".to_string(),
        GameError::RangeExhausted => {
            "⚠️ Every number in the range is excluded. Start over with /gbingo.".to_string()
        }
    }
}

fn help_text(default_policy: GenerationPolicy) -> String {
    format!(
        "👋 Hi! I'm a random number generator (<b>Gbingo</b>).\n\n\
<b>Commands:</b>\n\
🎲 /gbingo N min max [mode] - set parameters and reset the history\n\
🔢 /gnum X - draw X rows (1 to {MAX_DRAW_ROWS})\n\
🔎 /gsrch X - find when number X was drawn (for everyone)\n\
🎯 /gforce a b - numbers that must appear in the next draw\n\
🚫 /gexclude a b - numbers that must never be drawn\n\
📊 /gstats - draw frequency (sent privately)\n\n\
Modes: <code>distinct</code>, <code>exclusion</code> (default: <code>{default_policy}</code>)\n\n\
<b>Example:</b>\n\
/gbingo 5 1 100\n\
/gnum 3\n\
/gsrch 42"
    )
}

fn join_numbers(values: &[Number]) -> String {
    values
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

struct Caller {
    chat_id: ChatId,
    user_id: Option<UserId>,
    username: String,
    message: MessageRef,
}

impl Caller {
    fn reply_chat(&self, audience: Audience) -> ChatId {
        match (audience, self.user_id) {
            (Audience::Private, Some(user)) => ChatId::from(user),
            _ => self.chat_id,
        }
    }
}

async fn send_split(state: &AppState, chat_id: ChatId, html: &str) -> gbingo_core::Result<()> {
    for chunk in split_text_chunks(html, state.message_limit()) {
        state.messenger.send_html(chat_id, &chunk).await?;
    }
    Ok(())
}

/// Send to `reply_to`. When a private reply cannot be delivered, leave a hint
/// in the originating group instead.
async fn reply(
    state: &AppState,
    caller: &Caller,
    reply_to: ChatId,
    html: &str,
) -> gbingo_core::Result<()> {
    let Err(e) = send_split(state, reply_to, html).await else {
        return Ok(());
    };
    if reply_to != caller.chat_id {
        if let Err(hint_err) = send_split(state, caller.chat_id, DM_UNAVAILABLE).await {
            tracing::warn!("group hint failed: {hint_err}");
        }
    }
    Err(e)
}

async fn refuse_chat(state: &AppState, chat_id: ChatId) {
    if let Err(e) = send_split(state, chat_id, CHAT_NOT_ALLOWED).await {
        tracing::warn!(chat_id = chat_id.0, "refusal reply failed: {e}");
    }
}

fn audit(state: &AppState, event: AuditEvent) {
    if let Err(e) = state.audit.write(event) {
        tracing::warn!("audit write failed: {e}");
    }
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, args) = parse_command(text);
    let Some(access) = access_for(&cmd) else {
        return Ok(());
    };

    let chat_id = ChatId(msg.chat.id.0);
    let user = msg.from();
    let caller = Caller {
        chat_id,
        user_id: user.map(|u| UserId(u.id.0 as i64)),
        username: user
            .and_then(|u| u.username.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        message: MessageRef::new(chat_id, MessageId(msg.id.0)),
    };
    let user_id = caller.user_id.map(|u| u.0);

    let decision = match state
        .authorizer
        .authorize(access, chat_id, caller.user_id)
        .await
    {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(chat_id = chat_id.0, "authorization lookup failed: {e}");
            audit(
                &state,
                AuditEvent::error(chat_id.0, user_id, &caller.username, &cmd, &e.to_string()),
            );
            return Ok(());
        }
    };

    match decision {
        Decision::Allowed => {}
        Decision::ChatNotAllowed => {
            audit(
                &state,
                AuditEvent::auth(chat_id.0, user_id, &caller.username, &cmd, false),
            );
            refuse_chat(&state, chat_id).await;
            return Ok(());
        }
        Decision::Denied => {
            tracing::debug!(chat_id = chat_id.0, ?user_id, cmd = %cmd, "command denied");
            audit(
                &state,
                AuditEvent::auth(chat_id.0, user_id, &caller.username, &cmd, false),
            );
            return Ok(());
        }
    }

    let audience = audience_for(&cmd);
    if audience == Audience::Private && !chat_id.is_private() {
        if let Err(e) = state.messenger.delete_message(caller.message).await {
            tracing::debug!("could not delete /{cmd} message: {e}");
        }
    }
    let reply_to = caller.reply_chat(audience);

    let command = match GameCommand::parse(&cmd, &args) {
        Ok(c) => c,
        Err(usage) => {
            if let Err(e) = reply(&state, &caller, reply_to, &usage.text()).await {
                tracing::warn!("usage reply failed: {e}");
            }
            return Ok(());
        }
    };

    match execute(&state, &caller, reply_to, command).await {
        Ok(summary) => audit(
            &state,
            AuditEvent::command(
                chat_id.0,
                user_id,
                &caller.username,
                &cmd,
                &args,
                Some(&summary),
            ),
        ),
        Err(Error::Game(e)) => {
            let text = game_error_text(&e);
            if let Err(send_err) = reply(&state, &caller, reply_to, &text).await {
                tracing::warn!("error reply failed: {send_err}");
            }
            audit(
                &state,
                AuditEvent::command(
                    chat_id.0,
                    user_id,
                    &caller.username,
                    &cmd,
                    &args,
                    Some(&e.to_string()),
                ),
            );
        }
        Err(e) => {
            tracing::warn!(chat_id = chat_id.0, cmd = %cmd, "command failed: {e}");
            audit(
                &state,
                AuditEvent::error(chat_id.0, user_id, &caller.username, &cmd, &e.to_string()),
            );
        }
    }

    Ok(())
}

/// Run a validated command and send its replies. Returns a short summary for
/// the audit log.
async fn execute(
    state: &AppState,
    caller: &Caller,
    reply_to: ChatId,
    command: GameCommand,
) -> gbingo_core::Result<String> {
    match command {
        GameCommand::Start => {
            reply(state, caller, reply_to, &help_text(state.game.default_policy())).await?;
            Ok("help".to_string())
        }
        GameCommand::Configure {
            row_width,
            low,
            high,
            policy,
        } => {
            let cfg = state
                .game
                .reconfigure(caller.chat_id, row_width, low, high, policy)
                .await?;
            let text = format!(
                "✅ Settings saved!\n\
📌 Numbers per row: {}\n\
📌 Range: {} — {}\n\
🎲 Mode: {}\n\
📜 History cleared.",
                cfg.row_width, cfg.low, cfg.high, cfg.policy
            );
            reply(state, caller, reply_to, &text).await?;
            if let Err(e) = state.game.refresh_history().await {
                tracing::warn!("could not post the history board: {e}");
            }
            Ok(text)
        }
        GameCommand::Draw { rows } => {
            let out = state.game.draw(rows).await?;
            if let Err(e) = state.game.publish_history(&out.history).await {
                tracing::warn!("history board update failed: {e}");
            }
            let text = draw_text(&out.batch_rows());
            reply(state, caller, reply_to, &text).await?;
            Ok(text)
        }
        GameCommand::Search { target } => {
            let hits = state.game.search(target).await?;
            let text = search_text(target, &hits);
            reply(state, caller, reply_to, &text).await?;
            Ok(text)
        }
        GameCommand::Force { values } => {
            state.game.set_forced(&values).await?;
            let text = format!("🎯 Forced for the next draw: {}", join_numbers(&values));
            reply(state, caller, reply_to, &text).await?;
            Ok(text)
        }
        GameCommand::Exclude { values } => {
            let total = state.game.set_forbidden(&values).await?;
            let text = format!(
                "🚫 Excluded: {}\nTotal excluded: {total}",
                join_numbers(&values)
            );
            reply(state, caller, reply_to, &text).await?;
            Ok(text)
        }
        GameCommand::Stats => {
            let freq = state.game.frequency_report().await?;
            reply(state, caller, reply_to, &frequency_text(&freq)).await?;
            Ok(format!("{} distinct values", freq.len()))
        }
    }
}
