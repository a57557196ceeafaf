use color_eyre::eyre::Result;
use serde_json::json;
use tutanota_core::{ClientError, Folder, MailboxReader};

use super::Ctx;
use crate::diagnostics::LOG_DIAGNOSTICS;

/// `folders list`: enumerate the mailbox's folders and labels.
pub async fn list(ctx: &Ctx) -> Result<()> {
    let folders = match load(ctx).await {
        Err(ClientError::AuthFailed) => {
            ctx.discard_session_for_retry();
            load(ctx).await
        }
        outcome => outcome,
    }?;

    if ctx.json {
        let items: Vec<_> = folders
            .iter()
            .map(|f| {
                json!({
                    "id": f.id.element_id,
                    "listId": f.id.list_id,
                    "name": f.display_name(),
                    "folderType": f.folder_type,
                    "color": f.color,
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(items));
    } else {
        for folder in &folders {
            println!("{}  {}", folder.id.element_id, folder.display_name());
        }
    }
    Ok(())
}

async fn load(ctx: &Ctx) -> Result<Vec<Folder>, ClientError> {
    let (rest, mut chain, mail_group) = ctx.open_mailbox().await?;
    MailboxReader::new(&rest, &mut chain, mail_group)
        .with_diagnostics(&LOG_DIAGNOSTICS)
        .load_folders()
        .await
}
