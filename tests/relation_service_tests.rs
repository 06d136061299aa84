use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use eziogram::{
    config::Config,
    models::{Reel, RelationKind, RelationSnapshot, Story, Subject},
    services::{RelationService, RestRelationStore, ToggleOutcome},
};

fn service(server: &MockServer) -> RelationService {
    let config = Config {
        backend_url: server.uri(),
        backend_anon_key: "anon-key".to_string(),
        ..Config::default()
    };
    let store = RestRelationStore::new(&config)
        .unwrap()
        .with_access_token("user-token");
    RelationService::new(Arc::new(store))
}

#[tokio::test]
async fn mount_reel_seeds_counter_and_writes_reel_column() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/likes"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("reel_id", "eq.r7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/likes"))
        .and(body_json(json!({ "user_id": "u1", "reel_id": "r7" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let reel: Reel = serde_json::from_value(json!({
        "id": "r7",
        "user_id": "creator",
        "video_url": "https://cdn.example.com/r7.mp4",
        "caption": null,
        "music": null,
        "likes_count": 12,
        "created_at": null
    }))
    .unwrap();

    let like = service(&server)
        .mount_reel(&reel, Some(&Subject::new("u1")))
        .await;
    assert_eq!(like.kind(), RelationKind::LikeReel);
    assert_eq!(like.snapshot(), RelationSnapshot::new(false, 12));

    let outcome = like.toggle_pending().unwrap().confirm().await;
    assert_eq!(outcome, ToggleOutcome::Confirmed);
    assert_eq!(like.snapshot(), RelationSnapshot::new(true, 13));
}

#[tokio::test]
async fn mount_story_with_null_counter_starts_at_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/likes"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("story_id", "eq.s3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 9,
            "user_id": "u1",
            "story_id": "s3"
        }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/likes"))
        .and(query_param("user_id", "eq.u1"))
        .and(query_param("story_id", "eq.s3"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let story: Story = serde_json::from_value(json!({
        "id": "s3",
        "user_id": "friend",
        "media_url": "https://cdn.example.com/s3.jpg",
        "likes_count": null,
        "created_at": null
    }))
    .unwrap();

    let like = service(&server)
        .mount_story(&story, Some(&Subject::new("u1")))
        .await;
    assert_eq!(like.kind(), RelationKind::LikeStory);
    assert_eq!(like.snapshot(), RelationSnapshot::new(true, 0));

    // 计数为 0 时取消点赞不下溢，失败后恢复原样
    let pending = like.toggle_pending().unwrap();
    assert_eq!(like.snapshot(), RelationSnapshot::new(false, 0));
    assert_eq!(pending.confirm().await, ToggleOutcome::RolledBack);
    assert_eq!(like.snapshot(), RelationSnapshot::new(true, 0));
}

#[tokio::test]
async fn mount_target_follow_uses_follow_columns() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/follows"))
        .and(query_param("follower_id", "eq.u1"))
        .and(query_param("following_id", "eq.u2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let follow = service(&server)
        .mount_target(RelationKind::Follow, "u2", 4, Some(&Subject::new("u1")))
        .await;
    assert!(follow.can_toggle());
    assert_eq!(follow.snapshot(), RelationSnapshot::new(false, 4));
}
