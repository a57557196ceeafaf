use color_eyre::eyre::Result;
use serde_json::json;
use tutanota_core::{
    ClientError, EntityId,
    user::UserKeyMaterial,
};
use tutanota_model::{CUSTOMER, USER, wire};

use super::Ctx;

const CUSTOMER_TYPE: u32 = 34;

struct Profile {
    user_id: String,
    user_group: String,
    mail_group: Option<String>,
    membership_count: usize,
    customer_id: Option<String>,
    customer_type: Option<i64>,
}

/// `profile`: show account structure from the user and customer entities.
pub async fn run(ctx: &Ctx) -> Result<()> {
    let profile = match load(ctx).await {
        Err(ClientError::AuthFailed) => {
            ctx.discard_session_for_retry();
            load(ctx).await
        }
        outcome => outcome,
    }?;

    if ctx.json {
        println!(
            "{}",
            json!({
                "userId": profile.user_id,
                "userGroup": profile.user_group,
                "mailGroup": profile.mail_group,
                "memberships": profile.membership_count,
                "customerId": profile.customer_id,
                "customerType": profile.customer_type,
            })
        );
    } else {
        println!("User: {}", profile.user_id);
        println!("User group: {}", profile.user_group);
        if let Some(mail_group) = &profile.mail_group {
            println!("Mail group: {mail_group}");
        }
        println!("Memberships: {}", profile.membership_count);
        if let Some(customer) = &profile.customer_id {
            match profile.customer_type {
                Some(t) => println!("Customer: {customer} (type {t})"),
                None => println!("Customer: {customer}"),
            }
        }
    }
    Ok(())
}

async fn load(ctx: &Ctx) -> Result<Profile, ClientError> {
    let (rest, session, _key) = ctx.establish().await?;

    let user = rest
        .load_entity(&USER, &EntityId::from(session.user_id.as_str()))
        .await?;
    let material = UserKeyMaterial::from_wire(&user)?;

    let mut customer_type = None;
    if let Some(customer_id) = &material.customer {
        let customer = rest
            .load_entity(&CUSTOMER, &EntityId::from(customer_id.as_str()))
            .await?;
        customer_type = wire::attr_str(&customer, CUSTOMER_TYPE)
            .and_then(|t| t.parse().ok());
    }

    Ok(Profile {
        user_id: session.user_id,
        user_group: material.user_group.group.clone(),
        mail_group: material.mail_membership().map(|m| m.group.clone()),
        membership_count: material.memberships.len(),
        customer_id: material.customer.clone(),
        customer_type,
    })
}
