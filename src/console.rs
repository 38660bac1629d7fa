// =============================================================================
// 管理コンソール
// =============================================================================
//
// 標準入力から1行1コマンドで読み取り、エンジンに依頼する。
// コインの追加・削除はプレイヤー向けAPIには出さず、ここからのみ行う。
//
//   help
//   coins
//   players
//   add <id> <price> <name...> [| <owner label>]
//   remove <id>
//   quit

use std::fmt::Write as _;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::engine::EngineHandle;
use crate::error::TradeError;
use crate::models::NewCoin;

pub const HELP_TEXT: &str = "\
commands:
  help                                      show this text
  coins                                     list coins
  players                                   show the leaderboard
  add <id> <price> <name...> [| <owner>]    list a new coin
  remove <id>                               delist a coin
  quit                                      close the console";

/// コンソールのコマンド
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Help,
    Coins,
    Players,
    Add(NewCoin),
    Remove(String),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("not a number: {0}")]
    InvalidNumber(String),
}

/// 1行をコマンドに変換する（空行は None）
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, CommandError> {
    let line = line.trim();
    let Some((word, rest)) = split_word(line) else {
        return Ok(None);
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "help" | "?" => ConsoleCommand::Help,
        "coins" | "list" => ConsoleCommand::Coins,
        "players" | "leaderboard" => ConsoleCommand::Players,
        "quit" | "exit" => ConsoleCommand::Quit,
        "remove" | "rm" => {
            let (id, _) = split_word(rest).ok_or(CommandError::MissingArgument("id"))?;
            ConsoleCommand::Remove(id.to_string())
        }
        "add" => ConsoleCommand::Add(parse_add(rest)?),
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// add <id> <price> <name...> [| <owner>]
fn parse_add(args: &str) -> Result<NewCoin, CommandError> {
    let (id, rest) = split_word(args).ok_or(CommandError::MissingArgument("id"))?;
    let (price, rest) = split_word(rest).ok_or(CommandError::MissingArgument("price"))?;
    let price = Decimal::from_str(price).map_err(|_| CommandError::InvalidNumber(price.to_string()))?;

    let (name, owner) = match rest.split_once('|') {
        Some((name, owner)) => (name.trim(), owner.trim()),
        None => (rest.trim(), ""),
    };
    if name.is_empty() {
        return Err(CommandError::MissingArgument("name"));
    }
    // 発行元の指定がなければ名前から作る
    let owner = if owner.is_empty() { format!("{name} corp.") } else { owner.to_string() };

    Ok(NewCoin::new(id, name, owner, price))
}

fn split_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(i) => Some((&s[..i], &s[i..])),
        None => Some((s, "")),
    }
}

/// コマンドを実行して表示用テキストを返す
pub async fn execute(engine: &EngineHandle, command: ConsoleCommand) -> Result<String, TradeError> {
    let mut out = String::new();
    match command {
        ConsoleCommand::Help => out.push_str(HELP_TEXT),
        ConsoleCommand::Quit => out.push_str("bye"),
        ConsoleCommand::Coins => {
            let coins = engine.list_coins().await?;
            if coins.is_empty() {
                out.push_str("no coins listed");
            }
            for coin in coins {
                let _ = writeln!(
                    out,
                    "{:<14} {:<20} {:>12} {:>8}%  ({} points)",
                    coin.id,
                    coin.name,
                    coin.price,
                    coin.growth_percent,
                    coin.history.len()
                );
            }
        }
        ConsoleCommand::Players => {
            let players = engine.leaderboard().await?;
            if players.is_empty() {
                out.push_str("no players yet");
            }
            for (rank, p) in players.iter().enumerate() {
                let _ = writeln!(out, "#{:<3} {:<20} {:>14} (cash {})", rank + 1, p.name, p.net_worth, p.money);
            }
        }
        ConsoleCommand::Add(new_coin) => {
            let coin = engine.add_coin(new_coin).await?;
            info!(coin = %coin.id, "coin added from console");
            let _ = write!(out, "added {} at {}", coin.id, coin.price);
        }
        ConsoleCommand::Remove(id) => {
            let coin = engine.remove_coin(&id).await?;
            info!(coin = %coin.id, "coin removed from console");
            let _ = write!(out, "removed {}", coin.id);
        }
    }
    Ok(out.trim_end().to_string())
}

/// コンソールのループ
///
/// 入力が閉じるか quit で終了する。コマンドの失敗はエラー表示のみで続行。
pub async fn run_console<R, W>(engine: EngineHandle, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let reply = match parse_command(&line) {
            Ok(None) => continue,
            Ok(Some(ConsoleCommand::Quit)) => {
                output.write_all(b"bye\n").await?;
                break;
            }
            Ok(Some(command)) => match execute(&engine, command).await {
                Ok(text) => text,
                Err(TradeError::EngineUnavailable) => {
                    output.write_all(b"error: engine is not running\n").await?;
                    break;
                }
                Err(e) => format!("error: {e}"),
            },
            Err(e) => format!("error: {e}"),
        };
        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    output.flush().await?;
    Ok(())
}
