// Connection Tests - open/close lifecycle of the live connection

use super::helpers::FakeConnector;
use crate::connection::ConnectionManager;
use crate::protocol::{ClientEvent, ConversationRef, ServerEvent};
use std::sync::Arc;

#[tokio::test]
async fn test_open_joins_room_and_reports_viewers() {
    let connector = Arc::new(FakeConnector::with_viewers(&["peer"]));
    let manager = ConnectionManager::new(connector.clone());

    let opened = manager.open("c1", "token-1").await.expect("Failed to open");

    assert_eq!(opened.existing_viewers, vec!["peer".to_string()]);
    assert_eq!(*connector.credentials.lock().unwrap(), vec!["token-1".to_string()]);
    assert_eq!(
        connector.last_socket().emitted(),
        vec![ClientEvent::JoinConversation(ConversationRef {
            conversation_id: "c1".to_string()
        })]
    );
    assert!(manager.is_live().await);
}

#[tokio::test]
async fn test_events_flow_through_opened_connection() {
    let connector = Arc::new(FakeConnector::default());
    let manager = ConnectionManager::new(connector.clone());
    let mut opened = manager.open("c1", "t").await.unwrap();

    connector.push(ServerEvent::Connected);

    assert_eq!(opened.events.recv().await, Some(ServerEvent::Connected));
}

#[tokio::test]
async fn test_close_leaves_room_then_disconnects() {
    let connector = Arc::new(FakeConnector::default());
    let manager = ConnectionManager::new(connector.clone());
    let opened = manager.open("c1", "t").await.unwrap();

    manager.close(&opened.handle).await;

    let socket = connector.last_socket();
    assert_eq!(
        socket.emitted_names(),
        vec!["join_conversation", "leave_conversation"]
    );
    assert!(socket.is_closed());
    assert!(!manager.is_live().await);
}

#[tokio::test]
async fn test_reopen_closes_previous_connection_first() {
    let connector = Arc::new(FakeConnector::default());
    let manager = ConnectionManager::new(connector.clone());
    let first = manager.open("c1", "t").await.unwrap();

    let _second = manager.open("c2", "t").await.unwrap();

    let old = connector.socket(0);
    assert!(old.is_closed());
    assert_eq!(old.emitted_names(), vec!["join_conversation", "leave_conversation"]);
    assert!(!connector.socket(1).is_closed());

    // The stale handle no longer owns anything.
    manager.close(&first.handle).await;
    assert!(!connector.socket(1).is_closed());
    assert!(manager.is_live().await);
}

#[tokio::test]
async fn test_emit_after_close_fails() {
    let connector = Arc::new(FakeConnector::default());
    let manager = ConnectionManager::new(connector.clone());
    let opened = manager.open("c1", "t").await.unwrap();

    manager.close(&opened.handle).await;
    let result = opened
        .handle
        .emit(ClientEvent::LeaveConversation(ConversationRef {
            conversation_id: "c1".to_string(),
        }))
        .await;

    assert!(matches!(result, Err(crate::Error::Closed)));
}

#[tokio::test]
async fn test_connect_failure_is_reported() {
    let connector = Arc::new(FakeConnector {
        fail: true,
        ..Default::default()
    });
    let manager = ConnectionManager::new(connector);

    let result = manager.open("c1", "t").await;

    assert!(matches!(result, Err(crate::Error::Network(_))));
    assert!(!manager.is_live().await);
}
