//! End-to-end tests for the recommendation pipeline: behavior summaries,
//! strategy routing, affinity math, and ranked results.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use spacegraph::{ManualClock, MemoryStore, Role, SpaceGraph, SpaceStatus};

fn graph() -> (SpaceGraph<MemoryStore>, Arc<ManualClock>) {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let graph = SpaceGraph::with_clock(MemoryStore::new(), clock.clone());
    (graph, clock)
}

async fn register(graph: &SpaceGraph<MemoryStore>, names: &[&str]) {
    for name in names {
        graph
            .register(name, "pw", &format!("{name}@example.com"))
            .await
            .unwrap();
    }
}

// ============================================================================
// 1. Behavior summary
// ============================================================================

#[tokio::test]
async fn test_behavior_summary_counts() {
    let (graph, _clock) = graph();
    register(&graph, &["ada", "bea", "host"]).await;

    let post = graph.add_post("bea", "#rust news").await.unwrap();
    graph.add_post("ada", "my own post").await.unwrap();
    graph.repost("ada", &post).await.unwrap();
    graph.toggle_like("ada", &post, true).await.unwrap();
    graph.toggle_follow("ada", "bea", true).await.unwrap();
    let space = graph
        .create_space("host", "Rust live", "talk", &["rust"])
        .await
        .unwrap();
    graph.join_space("ada", &space, Role::Listener).await.unwrap();

    let summary = graph.behavior_summary("ada").await.unwrap();
    assert_eq!(summary.posts_count, 1);
    assert_eq!(summary.reposts_count, 1);
    assert_eq!(summary.likes_count, 1);
    assert_eq!(summary.spaces_count, 1);
    assert_eq!(summary.following_count, 1);

    // A brand-new account has nothing on record.
    let summary = graph.behavior_summary("bea").await.unwrap();
    assert_eq!(summary.spaces_count, 0);
    assert_eq!(summary.following_count, 0);
}

// ============================================================================
// 2. Cold start
// ============================================================================

#[tokio::test]
async fn test_cold_start_returns_latest_spaces() {
    let (graph, clock) = graph();
    register(&graph, &["host", "newbie"]).await;

    let oldest = graph
        .create_space("host", "Oldest", "first", &["a"])
        .await
        .unwrap();
    clock.advance(Duration::hours(1));
    let middle = graph
        .create_space("host", "Middle", "second", &["b"])
        .await
        .unwrap();
    clock.advance(Duration::hours(1));
    let newest = graph
        .create_space("host", "Newest", "third", &["c"])
        .await
        .unwrap();

    let recs = graph.recommend_spaces("newbie", 5).await.unwrap();
    let ids: Vec<&str> = recs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![newest.as_str(), middle.as_str(), oldest.as_str()]);
    assert_eq!(recs[0].host.as_deref(), Some("host"));
    assert!(recs.iter().all(|r| r.via_friend.is_none()));

    // top_n truncates after ordering.
    let recs = graph.recommend_spaces("newbie", 2).await.unwrap();
    let ids: Vec<&str> = recs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![newest.as_str(), middle.as_str()]);
}

#[tokio::test]
async fn test_no_spaces_every_strategy_is_empty() {
    let (graph, _clock) = graph();
    register(&graph, &["cold", "social", "busy", "friend"]).await;

    // social: follows someone; busy: has activity.
    graph.toggle_follow("social", "friend", true).await.unwrap();
    graph.add_post("busy", "#rust activity").await.unwrap();

    for user in ["cold", "social", "busy"] {
        let recs = graph.recommend_spaces(user, 5).await.unwrap();
        assert!(recs.is_empty(), "expected empty recommendations for {user}");
    }
}

// ============================================================================
// 3. Social-only branch
// ============================================================================

#[tokio::test]
async fn test_social_only_surfaces_friends_spaces() {
    let (graph, clock) = graph();
    register(&graph, &["ada", "f1", "f2", "host"]).await;

    let older = graph
        .create_space("host", "Older", "first", &["a"])
        .await
        .unwrap();
    clock.advance(Duration::hours(1));
    let newer = graph
        .create_space("host", "Newer", "second", &["b"])
        .await
        .unwrap();

    graph.toggle_follow("ada", "f1", true).await.unwrap();
    graph.toggle_follow("ada", "f2", true).await.unwrap();
    graph.join_space("f1", &older, Role::Listener).await.unwrap();
    graph.join_space("f1", &newer, Role::Speaker).await.unwrap();
    graph.join_space("f2", &newer, Role::Listener).await.unwrap();

    let recs = graph.recommend_spaces("ada", 10).await.unwrap();

    // One entry per (friend, membership) — the newer space appears once for
    // each friend who joined it; nothing is deduplicated.
    assert_eq!(recs.len(), 3);
    let ids: Vec<&str> = recs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![newer.as_str(), newer.as_str(), older.as_str()]);
    assert!(recs.iter().all(|r| r.via_friend.is_some()));

    let friends_for_newer: Vec<&str> = recs
        .iter()
        .filter(|r| r.id == newer)
        .map(|r| r.via_friend.as_deref().unwrap())
        .collect();
    assert_eq!(friends_for_newer, vec!["f1", "f2"]);

    // The social branch never computes a topic vector — ada's profile is
    // flat zero even while recommendations flow.
    let affinity = graph.affinity_vector("ada").await.unwrap();
    assert!(affinity.values().all(|score| *score == 0.0));
}

// ============================================================================
// 4. Affinity math
// ============================================================================

#[tokio::test]
async fn test_affinity_posts_reposts_scenario() {
    let (graph, _clock) = graph();
    register(&graph, &["a", "b", "host"]).await;

    // User a: 2 own posts tagged #music, 1 repost of a #music post.
    let original = graph.add_post("b", "fresh drop #music").await.unwrap();
    graph.add_post("a", "love this #music").await.unwrap();
    graph.add_post("a", "more #music").await.unwrap();
    graph.repost("a", &original).await.unwrap();

    graph
        .create_space("host", "Music space", "tunes", &["music"])
        .await
        .unwrap();
    graph
        .create_space("host", "Sports space", "games", &["sports"])
        .await
        .unwrap();

    let affinity = graph.affinity_vector("a").await.unwrap();
    assert_eq!(affinity["music"], 2.0 * 3.0 + 1.0 * 2.0);
    assert_eq!(affinity["sports"], 0.0);

    // A new user scores zero on every dimension.
    let blank = graph.affinity_vector("host").await.unwrap();
    assert!(blank.values().all(|score| *score == 0.0));
}

#[tokio::test]
async fn test_affinity_membership_weights_duration() {
    let (graph, clock) = graph();
    register(&graph, &["host", "mod"]).await;
    let space = graph
        .create_space("host", "Jazz", "live", &["jazz", "blues"])
        .await
        .unwrap();

    graph.join_space("mod", &space, Role::Moderator).await.unwrap();
    clock.advance(Duration::hours(2));
    graph.leave_space("mod", &space).await.unwrap();

    // moderator weight 1.7 × 2 hours, on each topic of the space.
    let affinity = graph.affinity_vector("mod").await.unwrap();
    assert!((affinity["jazz"] - 3.4).abs() < 1e-9);
    assert!((affinity["blues"] - 3.4).abs() < 1e-9);

    // The stored duration is final: more wall time changes nothing.
    clock.advance(Duration::hours(5));
    let later = graph.affinity_vector("mod").await.unwrap();
    assert!((later["jazz"] - 3.4).abs() < 1e-9);
}

#[tokio::test]
async fn test_affinity_live_membership_grows() {
    let (graph, clock) = graph();
    register(&graph, &["host", "ada"]).await;
    let space = graph
        .create_space("host", "Jazz", "live", &["jazz"])
        .await
        .unwrap();
    graph.join_space("ada", &space, Role::Speaker).await.unwrap();

    clock.advance(Duration::hours(1));
    let affinity = graph.affinity_vector("ada").await.unwrap();
    assert!((affinity["jazz"] - 1.5).abs() < 1e-9);

    clock.advance(Duration::hours(1));
    let affinity = graph.affinity_vector("ada").await.unwrap();
    assert!((affinity["jazz"] - 3.0).abs() < 1e-9);

    // The host's own edge carries host weight from the space's creation.
    let host_affinity = graph.affinity_vector("host").await.unwrap();
    assert!((host_affinity["jazz"] - 4.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_affinity_frozen_when_space_ends() {
    let (graph, clock) = graph();
    register(&graph, &["host", "ada"]).await;
    let space = graph
        .create_space("host", "Jazz", "live", &["jazz"])
        .await
        .unwrap();
    graph.join_space("ada", &space, Role::Listener).await.unwrap();

    clock.advance(Duration::hours(2));
    graph.end_space("host", &space).await.unwrap();
    clock.advance(Duration::hours(10));

    // Ended space: stored durations, not live ones.
    let member = graph.affinity_vector("ada").await.unwrap();
    assert!((member["jazz"] - 2.0).abs() < 1e-9);
    let host = graph.affinity_vector("host").await.unwrap();
    assert!((host["jazz"] - 4.0).abs() < 1e-9);
}

// ============================================================================
// 5. Ranked branch
// ============================================================================

#[tokio::test]
async fn test_ranked_top_one_picks_matching_space() {
    let (graph, _clock) = graph();
    register(&graph, &["a", "b", "host"]).await;

    let original = graph.add_post("b", "fresh drop #music").await.unwrap();
    graph.add_post("a", "love this #music").await.unwrap();
    graph.add_post("a", "more #music").await.unwrap();
    graph.repost("a", &original).await.unwrap();

    let music = graph
        .create_space("host", "Music space", "tunes", &["music"])
        .await
        .unwrap();
    graph
        .create_space("host", "Sports space", "games", &["sports"])
        .await
        .unwrap();

    let recs = graph.recommend_spaces("a", 1).await.unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].id, music);
    assert_eq!(recs[0].name, "Music space");
    assert_eq!(recs[0].host.as_deref(), Some("host"));
    assert_eq!(recs[0].status, SpaceStatus::Alive);
    assert!(recs[0].via_friend.is_none());
}

#[tokio::test]
async fn test_ranked_zero_profile_keeps_creation_order() {
    let (graph, clock) = graph();
    register(&graph, &["ada", "host"]).await;

    // Activity with no topics: the affinity vector is all zeros, every
    // similarity is 0, and the stable sort keeps creation order.
    graph.add_post("ada", "untagged thoughts").await.unwrap();

    let first = graph
        .create_space("host", "First", "one", &["a"])
        .await
        .unwrap();
    clock.advance(Duration::hours(1));
    let second = graph
        .create_space("host", "Second", "two", &["b"])
        .await
        .unwrap();

    let recs = graph.recommend_spaces("ada", 5).await.unwrap();
    let ids: Vec<&str> = recs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);
}

#[tokio::test]
async fn test_ranked_respects_top_n() {
    let (graph, _clock) = graph();
    register(&graph, &["ada", "host"]).await;
    graph.add_post("ada", "#a #b #c").await.unwrap();

    for (name, topic) in [("A", "a"), ("B", "b"), ("C", "c")] {
        graph
            .create_space("host", name, "space", &[topic])
            .await
            .unwrap();
    }

    let recs = graph.recommend_spaces("ada", 2).await.unwrap();
    assert_eq!(recs.len(), 2);
}

// ============================================================================
// 6. Payload shape
// ============================================================================

#[tokio::test]
async fn test_recommendation_payload_serializes() {
    let (graph, _clock) = graph();
    register(&graph, &["host", "newbie"]).await;
    graph
        .create_space("host", "Jazz", "live jazz", &["jazz"])
        .await
        .unwrap();

    let recs = graph.recommend_spaces("newbie", 5).await.unwrap();
    let json = serde_json::to_value(&recs[0]).unwrap();
    assert_eq!(json["name"], "Jazz");
    assert_eq!(json["description"], "live jazz");
    assert_eq!(json["status"], "alive");
    assert_eq!(json["host"], "host");
    assert!(json["via_friend"].is_null());
}
