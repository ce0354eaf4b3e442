use std::sync::Arc;

use courier_client::{CourierClient, CreateParcelRequest};
use courier_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use courier_hex::outbound::memory::{FakeCheckoutGateway, StaticIdentityVerifier};
use courier_repo::build_repo;
use courier_types::domain::parcel::{DeliveryStatus, PaymentStatus};
use serde_json::{json, Map};

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::test]
async fn client_drives_request_and_checkout() {
    let port = find_free_port();
    let repo = Arc::new(build_repo(None).await.expect("build repo"));
    let gateway = Arc::new(FakeCheckoutGateway::new());
    let identity = StaticIdentityVerifier::new().with_token("tok", "sam@example.com");
    let state = AppState::new(
        repo,
        Arc::new(identity),
        gateway.clone(),
        "http://site.test".into(),
    );
    let server = HttpServer::new(
        state,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await
    .unwrap();
    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let base = format!("http://127.0.0.1:{}", port);
    let client = CourierClient::builder(&base)
        .unwrap()
        .with_bearer_token("tok")
        .unwrap()
        .build()
        .unwrap();

    let mut details = Map::new();
    details.insert("receiverName".into(), json!("Karim"));
    let parcel = client
        .create_parcel(&CreateParcelRequest {
            parcel_name: "Laptop".into(),
            courier_cost: 99.99,
            details,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(parcel.sender_email, "sam@example.com");
    assert_eq!(parcel.payment_status, PaymentStatus::Unpaid);

    let session = client.begin_checkout(parcel.id).await.unwrap();
    gateway.mark_paid(&session.session_id, "pi_client");
    let done = client.complete_checkout(&session.session_id).await.unwrap();
    assert!(done.success);
    assert_eq!(done.tracking_id.as_deref(), Some(parcel.tracking_id.as_str()));

    let payments = client.payments(None).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert!((payments[0].amount - 99.99).abs() < 1e-9);

    let pending = client
        .list_parcels(None, Some(DeliveryStatus::PendingPickup))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    let history = client.tracking_history(&parcel.tracking_id).await.unwrap();
    assert_eq!(history.len(), 2);

    client.delete_parcel(parcel.id).await.unwrap();
    assert!(client.get_parcel(parcel.id).await.is_err());

    handle.abort();
}
