///  To run :
///  cargo r --example client_example
use std::sync::Arc;

use courier_client::{CourierClient, CreateParcelRequest};
use courier_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use courier_hex::outbound::memory::{FakeCheckoutGateway, StaticIdentityVerifier};
use courier_repo::build_repo;
use courier_types::domain::parcel::DeliveryStatus;
use serde_json::{json, Map};
use tempfile::tempdir;

fn find_free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = find_free_port();
    let addr = format!("http://127.0.0.1:{port}/");

    // Use a temp file-backed SQLite DB so multiple connections see the same data.
    let tmp = tempdir()?;
    let db_path = tmp.path().join("courier.db");
    let db_url = format!("sqlite://{}", db_path.display());

    // Providers are replaced by in-process fakes so the demo runs offline.
    let repo = build_repo(Some(&db_url)).await?;
    let gateway = Arc::new(FakeCheckoutGateway::new());
    let identity = StaticIdentityVerifier::new().with_token("demo-token", "demo@example.com");
    let state = AppState::new(
        Arc::new(repo),
        Arc::new(identity),
        gateway.clone(),
        "http://localhost:5173".into(),
    );
    let server = HttpServer::new(
        state,
        HttpServerConfig {
            port: port.to_string(),
        },
    )
    .await?;

    let handle = tokio::spawn(async move {
        server.run().await.expect("server run");
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client = CourierClient::builder(&addr)?
        .with_bearer_token("demo-token")?
        .build()?;

    let mut details = Map::new();
    details.insert("receiverName".into(), json!("Karim"));
    details.insert("receiverDistrict".into(), json!("Dhaka"));
    let parcel = client
        .create_parcel(&CreateParcelRequest {
            parcel_name: "Documents".into(),
            courier_cost: 60.0,
            details,
            ..Default::default()
        })
        .await?;
    println!("Requested parcel id={} tracking={}", parcel.id, parcel.tracking_id);

    let session = client.begin_checkout(parcel.id).await?;
    println!("Checkout url={}", session.url);
    gateway.mark_paid(&session.session_id, "pi_demo");

    let done = client.complete_checkout(&session.session_id).await?;
    println!("Payment success={} transaction={:?}", done.success, done.transaction_id);

    let fetched = client.get_parcel(parcel.id).await?;
    assert_eq!(fetched.delivery_status, DeliveryStatus::PendingPickup);

    for event in client.tracking_history(&parcel.tracking_id).await? {
        println!("{} {}", event.created_at, event.details);
    }

    handle.abort();
    Ok(())
}
