//! Listing Tests
//!
//! Covers pet listings, item donations, vet-help fundraisers, and payments.

mod common;

use axum::http::StatusCode;
use common::{app, item_ids, parse_id, TEST_ADMIN_TOKEN};
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Pets
// ===========================================================================

#[tokio::test]
async fn lost_pet_is_marked_found_by_someone_else() {
    let app = app();
    let owner = app.create_user("pet_owner").await;
    let finder = app.create_user("pet_finder").await;

    let resp = app
        .post_json(
            "/v1/pets",
            json!({ "name": "Milo", "category": "cat", "status": "lost", "location": "Park" }),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    let pet_id = parse_id(&resp.json());

    let resp = app
        .post(&format!("/v1/pets/{}/found", pet_id), Some(&owner.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post(&format!("/v1/pets/{}/found", pet_id), Some(&finder.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "found");
    assert_eq!(resp.json()["found_by_id"], finder.id.to_string());

    let resp = app
        .post(&format!("/v1/pets/{}/found", pet_id), Some(&finder.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_message(), "pet is not lost");
}

#[tokio::test]
async fn pet_cannot_be_created_found_or_edited_to_found() {
    let app = app();
    let owner = app.create_user("pet_cheat").await;

    let resp = app
        .post_json(
            "/v1/pets",
            json!({ "name": "Rex", "category": "dog", "status": "found" }),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .post_json(
            "/v1/pets",
            json!({ "name": "Rex", "category": "dog" }),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.json()["status"], "adoption");
    let pet_id = parse_id(&resp.json());

    let resp = app
        .patch_json(
            &format!("/v1/pets/{}", pet_id),
            json!({ "status": "found" }),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .patch_json(
            &format!("/v1/pets/{}", pet_id),
            json!({ "description": "very good boy" }),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["description"], "very good boy");
}

#[tokio::test]
async fn pets_filter_by_status_and_category() {
    let app = app();
    let owner = app.create_user("pet_lister").await;
    let mut ids = Vec::new();
    for (name, category, status) in [
        ("A", "dog", "adoption"),
        ("B", "cat", "adoption"),
        ("C", "dog", "lost"),
    ] {
        let resp = app
            .post_json(
                "/v1/pets",
                json!({ "name": name, "category": category, "status": status }),
                Some(&owner.access_token),
            )
            .await;
        ids.push(parse_id(&resp.json()));
    }

    let body = app.get("/v1/pets?status=adoption", None).await.json();
    assert_eq!(item_ids(&body), vec![ids[1], ids[0]]);

    let body = app.get("/v1/pets?category=dog", None).await.json();
    assert_eq!(item_ids(&body), vec![ids[2], ids[0]]);

    let body = app
        .get("/v1/pets?status=lost&category=dog&limit=1", None)
        .await
        .json();
    assert_eq!(item_ids(&body), vec![ids[2]]);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn only_owner_deletes_pet() {
    let app = app();
    let owner = app.create_user("pet_del_owner").await;
    let other = app.create_user("pet_del_other").await;
    let resp = app
        .post_json(
            "/v1/pets",
            json!({ "name": "Tux", "category": "bird" }),
            Some(&owner.access_token),
        )
        .await;
    let pet_id = parse_id(&resp.json());

    let resp = app
        .delete(&format!("/v1/pets/{}", pet_id), Some(&other.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .delete(&format!("/v1/pets/{}", pet_id), Some(&owner.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get(&format!("/v1/pets/{}", pet_id), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Donations
// ===========================================================================

#[tokio::test]
async fn donation_is_reserved_once() {
    let app = app();
    let giver = app.create_user("giver").await;
    let taker = app.create_user("taker").await;
    let late = app.create_user("late").await;

    let resp = app
        .post_json(
            "/v1/donations",
            json!({ "title": "Dog crate", "category": "supplies" }),
            Some(&giver.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.json()["status"], "available");
    let donation_id = parse_id(&resp.json());

    let resp = app
        .post(
            &format!("/v1/donations/{}/reserve", donation_id),
            Some(&giver.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post(
            &format!("/v1/donations/{}/reserve", donation_id),
            Some(&taker.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "reserved");
    assert_eq!(resp.json()["reserved_by_id"], taker.id.to_string());

    let resp = app
        .post(
            &format!("/v1/donations/{}/reserve", donation_id),
            Some(&late.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let body = app.get("/v1/donations?status=available", None).await.json();
    assert_eq!(body["total"], 0);
    let body = app.get("/v1/donations?status=reserved", None).await.json();
    assert_eq!(item_ids(&body), vec![donation_id]);
}

#[tokio::test]
async fn donation_requires_title() {
    let app = app();
    let giver = app.create_user("lazy_giver").await;

    let resp = app
        .post_json(
            "/v1/donations",
            json!({ "title": "  ", "category": "food" }),
            Some(&giver.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "title cannot be empty");
}

// ===========================================================================
// Vet help and payments
// ===========================================================================

async fn create_fundraiser(app: &common::TestApp, owner: &common::TestUser, target: i64) -> Uuid {
    let resp = app
        .post_json(
            "/v1/vet-help",
            json!({
                "pet_name": "Biscuit",
                "title": "Leg surgery",
                "target_amount": target,
            }),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    parse_id(&resp.json())
}

#[tokio::test]
async fn fundraiser_target_must_be_positive() {
    let app = app();
    let owner = app.create_user("fr_zero").await;

    let resp = app
        .post_json(
            "/v1/vet-help",
            json!({ "pet_name": "Biscuit", "title": "Help", "target_amount": 0 }),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "target_amount must be positive");
}

#[tokio::test]
async fn payments_complete_fundraiser_and_are_idempotent() {
    let app = app();
    let owner = app.create_user("fr_owner").await;
    let donor = app.create_user("fr_donor").await;
    let fundraiser_id = create_fundraiser(&app, &owner, 5000).await;

    let payment = |payment_ref: &str, amount: i64| {
        json!({
            "user_id": donor.id,
            "fundraiser_id": fundraiser_id,
            "amount_minor_units": amount,
            "payment_ref": payment_ref,
        })
    };

    let resp = app
        .post_admin("/v1/payments/confirmed", payment("pay_1", 3000), None)
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .post_admin(
            "/v1/payments/confirmed",
            payment("pay_1", 3000),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["current_amount"], 3000);
    assert_eq!(resp.json()["status"], "active");

    let resp = app
        .post_admin(
            "/v1/payments/confirmed",
            payment("pay_1", 3000),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_message(), "payment already applied");

    let resp = app
        .post_admin(
            "/v1/payments/confirmed",
            payment("pay_2", 2500),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["current_amount"], 5500);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["donations"].as_array().unwrap().len(), 2);

    let body = app.get("/v1/vet-help?status=completed", None).await.json();
    assert_eq!(item_ids(&body), vec![fundraiser_id]);
}

#[tokio::test]
async fn payment_for_unknown_fundraiser_is_not_found() {
    let app = app();
    let resp = app
        .post_admin(
            "/v1/payments/confirmed",
            json!({
                "user_id": Uuid::new_v4(),
                "fundraiser_id": Uuid::new_v4(),
                "amount_minor_units": 100,
                "payment_ref": "pay_x",
            }),
            Some(TEST_ADMIN_TOKEN),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_past_i64_range_is_rejected_and_total_kept() {
    let app = app();
    let owner = app.create_user("fr_big_owner").await;
    let donor = app.create_user("fr_big_donor").await;
    let fundraiser_id = create_fundraiser(&app, &owner, 1000).await;

    let payment = |payment_ref: &str| {
        json!({
            "user_id": donor.id,
            "fundraiser_id": fundraiser_id,
            "amount_minor_units": i64::MAX,
            "payment_ref": payment_ref,
        })
    };

    let resp = app
        .post_admin("/v1/payments/confirmed", payment("pay_big_1"), Some(TEST_ADMIN_TOKEN))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .post_admin("/v1/payments/confirmed", payment("pay_big_2"), Some(TEST_ADMIN_TOKEN))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.error_message(),
        "payment would overflow the fundraiser total"
    );

    // the app keeps serving and the first payment stands alone
    let resp = app.get(&format!("/v1/vet-help/{}", fundraiser_id), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["current_amount"], i64::MAX);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["donations"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn owner_edits_fundraiser_but_not_amounts() {
    let app = app();
    let owner = app.create_user("fr_editor").await;
    let other = app.create_user("fr_other").await;
    let fundraiser_id = create_fundraiser(&app, &owner, 1000).await;

    let resp = app
        .patch_json(
            &format!("/v1/vet-help/{}", fundraiser_id),
            json!({ "title": "Stolen" }),
            Some(&other.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app
        .patch_json(
            &format!("/v1/vet-help/{}", fundraiser_id),
            json!({ "title": "Hip surgery", "current_amount": 999 }),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["title"], "Hip surgery");
    assert_eq!(resp.json()["current_amount"], 0);

    let resp = app
        .delete(
            &format!("/v1/vet-help/{}", fundraiser_id),
            Some(&owner.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);
}
