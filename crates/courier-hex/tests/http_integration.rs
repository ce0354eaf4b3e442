use std::sync::Arc;

use courier_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use courier_hex::outbound::memory::{FakeCheckoutGateway, StaticIdentityVerifier};
use courier_repo::{build_repo, Repo};
use courier_types::domain::parcel::{DeliveryStatus, Parcel};
use courier_types::domain::tracking_id::is_valid_tracking_id;
use courier_types::domain::user::{Role, User};
use courier_types::ports::user_repository::UserRepository;
use reqwest::StatusCode;
use serde_json::{json, Value};

const ADMIN: &str = "admin-token";
const SENDER: &str = "sam-token";
const RIDER: &str = "rina-token";

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

struct TestApp {
    addr: String,
    client: reqwest::Client,
    repo: Arc<Repo>,
    gateway: Arc<FakeCheckoutGateway>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestApp {
    async fn spawn() -> Self {
        let port = find_free_port();
        let config = HttpServerConfig {
            port: port.to_string(),
        };

        let repo = Arc::new(build_repo(None).await.expect("build repo"));
        let admin = repo
            .insert_user(User::new("admin@example.com".into(), "Admin".into(), None).unwrap())
            .await
            .unwrap();
        repo.set_user_role(admin.id, Role::Admin).await.unwrap();

        let identity = StaticIdentityVerifier::new()
            .with_token(ADMIN, "admin@example.com")
            .with_token(SENDER, "sam@example.com")
            .with_token(RIDER, "rina@example.com");
        let gateway = Arc::new(FakeCheckoutGateway::new());
        let state = AppState::new(
            repo.clone(),
            Arc::new(identity),
            gateway.clone(),
            "http://site.test".into(),
        );
        let server = HttpServer::new(state, config).await.unwrap();

        let handle = tokio::spawn(async move {
            server.run().await.expect("server run");
        });
        // Give the server a moment to start.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        Self {
            addr: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            repo,
            gateway,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    async fn create_parcel(&self) -> Parcel {
        let res = self
            .client
            .post(self.url("/parcels"))
            .bearer_auth(SENDER)
            .json(&json!({
                "parcelName": "Laptop",
                "courierCost": 120,
                "receiverName": "Karim",
                "receiverDistrict": "Dhaka"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn pay(&self, parcel: &Parcel, intent: &str) -> Value {
        let session: Value = self
            .client
            .post(self.url("/create-checkout-session"))
            .bearer_auth(SENDER)
            .json(&json!({ "parcelId": parcel.id }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let session_id = session["sessionId"].as_str().unwrap().to_string();
        self.gateway.mark_paid(&session_id, intent);
        self.client
            .patch(self.url(&format!("/payment-success?session_id={session_id}")))
            .bearer_auth(SENDER)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn guards_reject_before_any_write() {
    let app = TestApp::spawn().await;

    let res = app.client.get(app.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .client
        .post(app.url("/parcels"))
        .json(&json!({ "parcelName": "Box", "courierCost": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());

    let res = app
        .client
        .post(app.url("/parcels"))
        .bearer_auth("forged")
        .json(&json!({ "parcelName": "Box", "courierCost": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .client
        .get(app.url("/users"))
        .bearer_auth(SENDER)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let parcel = app.create_parcel().await;
    let res = app
        .client
        .patch(app.url("/parcels"))
        .bearer_auth(SENDER)
        .json(&json!({ "parcelId": parcel.id, "riderId": uuid::Uuid::new_v4() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let all: Vec<Parcel> = app
        .client
        .get(app.url("/parcels"))
        .bearer_auth(ADMIN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].delivery_status, DeliveryStatus::ParcelRequestSent);

    let res = app
        .client
        .get(app.url("/parcels/not-a-uuid"))
        .bearer_auth(SENDER)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .client
        .post(app.url("/parcels"))
        .bearer_auth(SENDER)
        .json(&json!({ "parcelName": "Box", "courierCost": -1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_admins_cannot_use_admin_routes() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .post(app.url("/users"))
        .bearer_auth(RIDER)
        .json(&json!({ "displayName": "Rina" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let user: User = res.json().await.unwrap();

    let res = app
        .client
        .patch(app.url(&format!("/users/{}/role", user.id)))
        .bearer_auth(RIDER)
        .json(&json!({ "approvalStatus": "approved" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let role: Value = app
        .client
        .get(app.url("/users/rina@example.com/role"))
        .bearer_auth(RIDER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(role["role"], "user");

    let res = app
        .client
        .post(app.url("/riders"))
        .bearer_auth(RIDER)
        .json(&json!({ "name": "Rina", "riderDistrict": "Dhaka" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let rider: Value = res.json().await.unwrap();
    let rider_id = rider["id"].as_str().unwrap().to_string();

    let res = app
        .client
        .get(app.url("/riders"))
        .bearer_auth(RIDER)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    for token in [RIDER, SENDER] {
        let res = app
            .client
            .patch(app.url(&format!("/riders/{rider_id}")))
            .bearer_auth(token)
            .json(&json!({ "status": "approved" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    let riders: Vec<Value> = app
        .client
        .get(app.url("/riders"))
        .bearer_auth(ADMIN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(riders.len(), 1);
    assert_eq!(riders[0]["status"], "pending");

    let stored = app
        .repo
        .find_user_by_email("rina@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.role, Role::User);
}

#[tokio::test]
async fn login_and_checkout_over_http() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .post(app.url("/users"))
        .bearer_auth(SENDER)
        .json(&json!({ "displayName": "Sam" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = app
        .client
        .post(app.url("/users"))
        .bearer_auth(SENDER)
        .json(&json!({ "displayName": "Sam" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "existing user logging in.");

    let parcel = app.create_parcel().await;
    assert!(is_valid_tracking_id(&parcel.tracking_id));
    assert_eq!(parcel.sender_email, "sam@example.com");
    assert_eq!(parcel.details["receiverName"], "Karim");

    // unpaid session: failure indicator, nothing written
    let session: Value = app
        .client
        .post(app.url("/create-checkout-session"))
        .bearer_auth(SENDER)
        .json(&json!({ "parcelId": parcel.id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let session_id = session["sessionId"].as_str().unwrap();
    let body: Value = app
        .client
        .patch(app.url(&format!("/payment-success?session_id={session_id}")))
        .bearer_auth(SENDER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "success": false }));

    let first = app.pay(&parcel, "pi_http").await;
    assert_eq!(first["success"], true);
    assert_eq!(first["trackingID"], parcel.tracking_id.as_str());
    assert_eq!(first["transactionID"], "pi_http");

    let stored: Parcel = app
        .client
        .get(app.url(&format!("/parcels/{}", parcel.id)))
        .bearer_auth(SENDER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored.delivery_status, DeliveryStatus::PendingPickup);

    let payments: Vec<Value> = app
        .client
        .get(app.url("/payments"))
        .bearer_auth(SENDER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["trackingID"], parcel.tracking_id.as_str());

    let res = app
        .client
        .get(app.url("/payments?email=admin@example.com"))
        .bearer_auth(SENDER)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .client
        .post(app.url("/create-checkout-session"))
        .bearer_auth(SENDER)
        .json(&json!({ "parcelId": parcel.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn completing_checkout_twice_is_idempotent() {
    let app = TestApp::spawn().await;
    let parcel = app.create_parcel().await;

    let session: Value = app
        .client
        .post(app.url("/create-checkout-session"))
        .bearer_auth(SENDER)
        .json(&json!({ "parcelId": parcel.id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let session_id = session["sessionId"].as_str().unwrap();
    app.gateway.mark_paid(session_id, "pi_twice");

    let url = app.url(&format!("/payment-success?session_id={session_id}"));
    let first: Value = app
        .client
        .patch(&url)
        .bearer_auth(SENDER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second: Value = app
        .client
        .patch(&url)
        .bearer_auth(SENDER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["message"], "Already paid for it.");
    assert_eq!(first["trackingID"], second["trackingID"]);
    assert_eq!(first["transactionID"], second["transactionID"]);

    let payments: Vec<Value> = app
        .client
        .get(app.url("/payments"))
        .bearer_auth(SENDER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(payments.len(), 1);
}

#[tokio::test]
async fn rider_assignment_and_delivery_over_http() {
    let app = TestApp::spawn().await;
    let parcel = app.create_parcel().await;
    app.pay(&parcel, "pi_rider").await;

    app.client
        .post(app.url("/users"))
        .bearer_auth(RIDER)
        .json(&json!({ "displayName": "Rina" }))
        .send()
        .await
        .unwrap();
    let res = app
        .client
        .post(app.url("/riders"))
        .bearer_auth(RIDER)
        .json(&json!({ "name": "Rina", "riderDistrict": "Dhaka", "bikeModel": "Hero" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let rider: Value = res.json().await.unwrap();
    let rider_id = rider["id"].as_str().unwrap().to_string();

    let res = app
        .client
        .patch(app.url(&format!("/riders/{rider_id}")))
        .bearer_auth(ADMIN)
        .json(&json!({ "status": "approved" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let role: Value = app
        .client
        .get(app.url("/users/rina@example.com/role"))
        .bearer_auth(RIDER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(role["role"], "rider");

    let available: Vec<Value> = app
        .client
        .get(app.url("/riders?status=approved&workStatus=Available&district=Dhaka"))
        .bearer_auth(ADMIN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(available.len(), 1);

    let res = app
        .client
        .patch(app.url("/parcels"))
        .bearer_auth(ADMIN)
        .json(&json!({ "parcelId": parcel.id, "riderId": rider_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let assigned: Parcel = res.json().await.unwrap();
    assert_eq!(assigned.delivery_status, DeliveryStatus::AssignedRider);
    assert_eq!(assigned.rider_id.map(|id| id.to_string()), Some(rider_id.clone()));

    let res = app
        .client
        .patch(app.url(&format!("/parcel/{}/status", parcel.id)))
        .bearer_auth(SENDER)
        .json(&json!({ "deliveryStatus": "rider_arriving" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let mine: Vec<Parcel> = app
        .client
        .get(app.url("/parcels/rider"))
        .bearer_auth(RIDER)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);

    for status in ["rider_arriving", "parcel_picked_up", "delivered"] {
        let res = app
            .client
            .patch(app.url(&format!("/parcel/{}/status", parcel.id)))
            .bearer_auth(RIDER)
            .json(&json!({ "deliveryStatus": status }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app
        .client
        .patch(app.url(&format!("/parcel/{}/status", parcel.id)))
        .bearer_auth(RIDER)
        .json(&json!({ "deliveryStatus": "rider_arriving" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // tracking is public
    let events: Vec<Value> = app
        .client
        .get(app.url(&format!("/parcelTracing/{}", parcel.tracking_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let statuses: Vec<&str> = events
        .iter()
        .map(|e| e["status"].as_str().unwrap())
        .collect();
    assert_eq!(
        statuses,
        vec![
            "Parcel_Request_Sent",
            "pending-pickup",
            "Assigned_Rider",
            "rider_arriving",
            "parcel_picked_up",
            "delivered"
        ]
    );
    assert_eq!(events[0]["details"], "Parcel Request Sent");

    let res = app
        .client
        .get(app.url("/parcelTracing/PRCL-20200101-000000"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let rider_user = app
        .repo
        .find_user_by_email("rina@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rider_user.role, Role::Rider);
}
