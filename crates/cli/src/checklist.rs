//! Auth and checklist commands.

use anyhow::{bail, Context, Result};
use tidemark_client::api::ChecklistApi;
use tidemark_client::session::AuthSession;
use tidemark_client::store::FileStore;
use tidemark_client::sync::FlushOutcome;
use tidemark_client::{Identity, SyncEngine};
use tidemark_core::achievement::{filter_view, ChecklistFilter, MergedAchievement, ProgressSummary};
use tidemark_core::error::CoreError;
use tidemark_core::types::AchievementId;

use crate::App;

type Engine = SyncEngine<ChecklistApi, FileStore>;

fn session(app: &App) -> Result<AuthSession<FileStore>> {
    Ok(AuthSession::load(app.api.clone(), app.store.clone())?)
}

/// Active identity, or an error telling the user how to get one.
fn require_identity(app: &App) -> Result<Identity> {
    match session(app)?.identity() {
        Some(identity) => Ok(identity),
        None => bail!("No active nickname; run `tidemark login` or `tidemark use <nickname>` first"),
    }
}

/// Engine for `identity` seeded from its backup, with the timer disarmed:
/// a one-shot command flushes explicitly before exiting.
fn open_engine(app: &App, identity: Identity) -> Result<Engine> {
    let engine = SyncEngine::new(
        app.api.clone(),
        app.store.clone(),
        identity.clone(),
        app.config.flush_debounce,
    );
    let restored = engine.restore(identity)?;
    engine.cancel_timer();
    if restored > 0 {
        tracing::info!(restored, "Picked up unsynced progress");
    }
    Ok(engine)
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

pub async fn login(app: &App, nickname: &str, password: &str) -> Result<()> {
    let user = session(app)?.login(nickname, password).await?;
    println!("Signed in as {}", user.nickname);
    Ok(())
}

pub async fn register(app: &App, nickname: &str, password: &str, confirm: &str) -> Result<()> {
    let user = session(app)?.register(nickname, password, confirm).await?;
    println!("Registered and signed in as {}", user.nickname);
    Ok(())
}

pub async fn set_password(app: &App, nickname: &str, password: &str, confirm: &str) -> Result<()> {
    let user = session(app)?
        .set_password(nickname, password, confirm)
        .await?;
    println!("Password set; signed in as {}", user.nickname);
    Ok(())
}

pub fn logout(app: &App) -> Result<()> {
    session(app)?.logout()?;
    println!("Signed out");
    Ok(())
}

pub async fn whoami(app: &App) -> Result<()> {
    let mut session = session(app)?;
    match session.resume().await? {
        Some(user) => println!("Signed in as {} (id {})", user.nickname, user.id),
        None => match session.nickname() {
            Some(nickname) => println!("Using nickname {nickname} (not signed in)"),
            None => println!("No active nickname"),
        },
    }
    Ok(())
}

pub fn use_nickname(app: &App, nickname: &str) -> Result<()> {
    let identity = session(app)?.use_nickname(nickname)?;
    println!("Tracking progress as {}", identity.nickname);
    Ok(())
}

// ---------------------------------------------------------------------------
// Checklist
// ---------------------------------------------------------------------------

async fn load_view(app: &App, engine: Option<&Engine>) -> Result<Vec<MergedAchievement>> {
    let achievements = app
        .api
        .list_achievements()
        .await
        .context("Failed to fetch achievements")?;
    let Some(engine) = engine else {
        return Ok(tidemark_core::achievement::merge(
            &achievements,
            &[],
            &Default::default(),
        ));
    };
    let progress = app
        .api
        .get_progress(&engine.identity().nickname)
        .await
        .context("Failed to fetch progress")?;
    Ok(engine.view(&achievements, &progress))
}

pub async fn list(app: &App, filter: ChecklistFilter, search: &str, json: bool) -> Result<()> {
    let engine = match session(app)?.identity() {
        Some(identity) => Some(open_engine(app, identity)?),
        None => None,
    };
    let view = load_view(app, engine.as_ref()).await?;
    let shown = filter_view(&view, filter, search);

    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    for item in &shown {
        let mark = if item.is_completed { "x" } else { " " };
        let pending = if item.is_pending { "*" } else { "" };
        let legacy = if item.achievement.is_legacy { " [legacy]" } else { "" };
        println!(
            "[{mark}]{pending} #{:<4} {} ({} pts){legacy}",
            item.achievement.id, item.achievement.name, item.achievement.point
        );
    }

    let summary = ProgressSummary::from_view(&view);
    println!(
        "{}/{} completed ({}%), {}/{} points",
        summary.completed,
        summary.total,
        summary.completion_rate,
        summary.earned_points,
        summary.total_points
    );
    Ok(())
}

pub async fn toggle(app: &App, ids: &[AchievementId]) -> Result<()> {
    let identity = require_identity(app)?;
    let engine = open_engine(app, identity)?;
    let view = load_view(app, Some(&engine)).await?;

    let stored = effective_states(&view, ids)?;

    for (id, stored) in ids.iter().zip(stored) {
        // Re-read the effective state so repeated ids flip back and forth.
        let current = engine.pending().get(*id).unwrap_or(stored);
        let target = engine.toggle(*id, current);
        println!("#{id} -> {}", if target { "completed" } else { "not completed" });
    }

    flush(&engine).await
}

pub async fn sync(app: &App) -> Result<()> {
    let identity = require_identity(app)?;
    let engine = open_engine(app, identity)?;
    flush(&engine).await
}

/// Effective state of every id in `ids`, failing on the first unknown id
/// so that nothing is recorded for a partly invalid command.
fn effective_states(view: &[MergedAchievement], ids: &[AchievementId]) -> Result<Vec<bool>, CoreError> {
    ids.iter()
        .map(|id| {
            view.iter()
                .find(|item| item.achievement.id == *id)
                .map(|item| item.is_completed)
                .ok_or(CoreError::NotFound {
                    entity: "Achievement",
                    id: *id,
                })
        })
        .collect()
}

async fn flush(engine: &Engine) -> Result<()> {
    match engine.flush_now().await {
        Ok(FlushOutcome::Empty) => println!("Nothing to sync"),
        Ok(FlushOutcome::Sent { updates }) => println!("Synced {updates} update(s)"),
        Ok(FlushOutcome::Queued) => println!("Sync already in progress"),
        Err(e) => {
            return Err(e).context(format!(
                "Sync failed; {} change(s) kept for the next `tidemark sync`",
                engine.pending().len()
            ))
        }
    }
    Ok(())
}
