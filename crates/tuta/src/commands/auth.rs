use color_eyre::eyre::Result;
use serde_json::json;
use tutanota_core::ClientError;

use super::Ctx;

/// `auth check`: validate or establish a session. Exit code 0 on success,
/// 1 on any failure; with `--json` both outcomes are structured.
pub async fn check(ctx: &Ctx) -> Result<()> {
    let outcome = match ctx.establish().await {
        Err(ClientError::AuthFailed) => {
            ctx.discard_session_for_retry();
            ctx.establish().await
        }
        outcome => outcome,
    };

    match outcome {
        Ok((_rest, session, _key)) => {
            if ctx.json {
                let session_id = session
                    .session_id
                    .as_ref()
                    .map(|(list, element)| json!([list, element]))
                    .unwrap_or(serde_json::Value::Null);
                println!(
                    "{}",
                    json!({"ok": true, "userId": session.user_id, "sessionId": session_id})
                );
            } else {
                println!("Session OK");
                println!("User: {}", session.user_id);
                if let Some((list, element)) = &session.session_id {
                    println!("Session: {list}/{element}");
                }
            }
            Ok(())
        }
        Err(e) => {
            if ctx.json {
                println!("{}", json!({"ok": false, "error": e.to_string()}));
                std::process::exit(1);
            }
            Err(e.into())
        }
    }
}

/// `auth logout`: forget the stored session. Succeeds when there is none.
pub async fn logout(ctx: &Ctx) -> Result<()> {
    ctx.store.clear()?;
    if ctx.json {
        println!("{}", json!({"ok": true}));
    } else {
        println!("Logged out");
    }
    Ok(())
}
