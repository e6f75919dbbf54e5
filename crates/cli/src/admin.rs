use anyhow::{bail, Result};
use tidemark_core::achievement::{Achievement, AchievementDraft, AchievementPatch};

use crate::{AdminCommand, App};

pub async fn run(app: &App, key: &str, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::Verify => {
            app.api.verify_admin(key).await?;
            println!("Admin key accepted");
        }
        AdminCommand::Create {
            name,
            content,
            point,
            discord_url,
            legacy,
        } => {
            let draft = AchievementDraft {
                name,
                content,
                point,
                discord_url,
                is_legacy: legacy,
            }
            .normalized()?;
            let created = app.api.create_achievement(key, &draft).await?;
            print_achievement("Created", &created);
        }
        AdminCommand::Update {
            id,
            name,
            content,
            point,
            discord_url,
            legacy,
        } => {
            let patch = AchievementPatch {
                name: name.map(|n| n.trim().to_string()),
                content: content.map(|c| c.trim().to_string()),
                point,
                discord_url: discord_url.map(|u| Some(u.trim().to_string()).filter(|u| !u.is_empty())),
                is_legacy: legacy,
            };
            if patch.is_empty() {
                bail!("Nothing to update; pass at least one field");
            }
            let updated = app.api.update_achievement(key, id, &patch).await?;
            print_achievement("Updated", &updated);
        }
        AdminCommand::Delete { id } => {
            app.api.delete_achievement(key, id).await?;
            println!("Deleted #{id}");
        }
    }
    Ok(())
}

fn print_achievement(action: &str, achievement: &Achievement) {
    println!(
        "{action} #{} {} ({} pts{})",
        achievement.id,
        achievement.name,
        achievement.point,
        if achievement.is_legacy { ", legacy" } else { "" }
    );
}
