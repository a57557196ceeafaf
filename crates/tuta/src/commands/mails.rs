use color_eyre::eyre::Result;
use serde_json::json;
use tutanota_core::{ClientError, MailHeader, MailboxReader};

use super::Ctx;
use crate::diagnostics::LOG_DIAGNOSTICS;

/// `mails list <folder-id>`: the newest mails of a folder, newest first.
pub async fn list(ctx: &Ctx, folder_id: &str) -> Result<()> {
    let mails = match load(ctx, folder_id).await {
        Err(ClientError::AuthFailed) => {
            ctx.discard_session_for_retry();
            load(ctx, folder_id).await
        }
        outcome => outcome,
    }?;

    if ctx.json {
        let items: Vec<_> = mails
            .iter()
            .map(|m| {
                json!({
                    "id": m.id.element_id,
                    "listId": m.id.list_id,
                    "subject": m.subject,
                    "receivedDate": m.received_date.map(|d| d.to_rfc3339()),
                    "unread": m.unread,
                    "state": m.state,
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(items));
    } else if mails.is_empty() {
        println!("No mails");
    } else {
        for mail in &mails {
            let date = mail
                .received_date
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let marker = if mail.unread { "*" } else { " " };
            println!("{} {date}  {}  {}", marker, mail.id.element_id, mail.subject);
        }
    }
    Ok(())
}

async fn load(ctx: &Ctx, folder_id: &str) -> Result<Vec<MailHeader>, ClientError> {
    let (rest, mut chain, mail_group) = ctx.open_mailbox().await?;
    MailboxReader::new(&rest, &mut chain, mail_group)
        .with_diagnostics(&LOG_DIAGNOSTICS)
        .list_mails(folder_id)
        .await
}
