//! Demo data for local runs and black-box tests.

use chrono::{DateTime, TimeZone, Utc};

use fire_accounts::{Gender, NewUserRequest, RequestState, User, UserDraft, UserState};
use fire_billing::{Voucher, VoucherState};
use fire_core::{DomainResult, NewUserRequestId, VoucherId};
use fire_messaging::Notice;

use crate::store::FireStore;

/// Handles to the seeded records tests usually need.
#[derive(Debug, Clone)]
pub struct Seeded {
    pub joel: User,
    pub maggie: User,
    pub marilyn: User,
    pub chris_request: NewUserRequest,
    pub maurice_request: NewUserRequest,
}

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).single()
}

fn person(name: &str, username: &str, email: &str, address: &str, gender: Gender) -> UserDraft {
    UserDraft {
        name: name.to_string(),
        username: username.to_string(),
        email: Some(email.to_string()),
        address: Some(address.to_string()),
        gender,
        ..Default::default()
    }
}

/// Load the demo data set. Does nothing (returns `None`) when the store
/// already has users.
pub async fn load(store: &dyn FireStore) -> DomainResult<Option<Seeded>> {
    if !store.list_users().await?.is_empty() {
        tracing::info!("store already populated, skipping seed");
        return Ok(None);
    }
    let now = Utc::now();

    let joel = store
        .insert_user(
            &UserDraft {
                phone_number: Some("1".into()),
                avatar_url: Some("http://24.media.tumblr.com/tumblr_lrt2nf1G7Y1qh4q2fo4_500.png".into()),
                ..person(
                    "Joel Fleischman",
                    "joel",
                    "joel.fleischman@mail.com",
                    "Flushing, Queens (New York City)",
                    Gender::Male,
                )
            },
            true,
            UserState::Active,
            now,
        )
        .await?;
    let maggie = store
        .insert_user(
            &UserDraft {
                phone_number: Some("2".into()),
                ..person(
                    "Maggie O'Connell",
                    "maggie",
                    "maggie.oconnell@mail.com",
                    "Cicely, Alaska",
                    Gender::Female,
                )
            },
            true,
            UserState::Active,
            now,
        )
        .await?;
    let marilyn = store
        .insert_user(
            &UserDraft {
                phone_number: Some("3".into()),
                avatar_url: Some("http://www.moosechick.com/Marilyn-totem.JPG".into()),
                ..person(
                    "Marilyn Whirlwind",
                    "marilyn",
                    "marilyn.whirlwind@mail.com",
                    "Cicely, Alaska",
                    Gender::Female,
                )
            },
            false,
            UserState::Active,
            now,
        )
        .await?;

    // Historical decisions for the accounts above.
    let accepted = |user: &User| NewUserRequest {
        id: NewUserRequestId::new(0),
        candidate: UserDraft {
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            address: user.address.clone(),
            gender: user.gender,
            phone_number: user.phone_number.clone(),
            avatar_url: user.avatar_url.clone(),
            password: None,
        },
        user_id: Some(user.id),
        admin_user_id: Some(joel.id),
        state: RequestState::Accepted,
        created: now,
        updated: now,
    };
    store.insert_new_user_request(accepted(&maggie)).await?;
    let marilyn_accepted = store.insert_new_user_request(accepted(&marilyn)).await?;

    let chris_request = store
        .create_new_user_request(
            person(
                "Chris Stevens",
                "chris",
                "chris.stevens@mail.com",
                "KBHR 570, Alaska",
                Gender::Male,
            ),
            now,
        )
        .await?;
    let maurice_request = store
        .insert_new_user_request(NewUserRequest {
            admin_user_id: Some(joel.id),
            state: RequestState::Rejected,
            ..NewUserRequest::pending(
                NewUserRequestId::new(0),
                person(
                    "Maurice Minnifield",
                    "maurice",
                    "maurice@mail.com",
                    "Some Ranch Somewhere, Alaska",
                    Gender::Male,
                ),
                now,
            )
        })
        .await?;

    store
        .post_message(maggie.id, marilyn.id, "Were you able to call?".into(), now)
        .await?;
    store
        .post_message(
            joel.id,
            marilyn.id,
            "Make sure you have credit before making a call".into(),
            now,
        )
        .await?;

    let voucher = |code: &str, total: i64, url: &str| Voucher {
        id: VoucherId::new(0),
        user_id: None,
        state: VoucherState::Inactive,
        code: code.to_string(),
        credit_total: total,
        credit_remaining: total,
        url: Some(url.to_string()),
        bulk_number: Some("bulk-80".to_string()),
        vendor: Some("EstPhonic".to_string()),
        created: now,
        activated: None,
        depleted: None,
    };
    store
        .insert_voucher(Voucher {
            user_id: Some(joel.id),
            state: VoucherState::Active,
            credit_remaining: 40,
            bulk_number: Some("bulk-50".to_string()),
            activated: at(2016, 7, 26, 23, 50),
            ..voucher("voucher1", 50, "http://vouchers/50")
        })
        .await?;
    let depleted = store
        .insert_voucher(Voucher {
            user_id: Some(marilyn.id),
            state: VoucherState::Depleted,
            credit_remaining: 0,
            activated: at(2016, 7, 26, 23, 50),
            depleted: at(2016, 7, 29, 20, 50),
            ..voucher("voucher2", 80, "http://vouchers/80")
        })
        .await?;
    store.insert_voucher(voucher("voucher3", 70, "http://vouchers/3")).await?;

    for notice in [
        Notice::NewUserAccepted(marilyn_accepted.id),
        Notice::NewUserRejected(maurice_request.id),
        Notice::ProfileUpdated(maggie.id),
        Notice::ToppedUp(depleted.id),
    ] {
        store.append_notification(notice, Utc::now()).await?;
    }

    tracing::info!("demo data loaded");
    Ok(Some(Seeded {
        joel,
        maggie,
        marilyn,
        chris_request,
        maurice_request,
    }))
}
